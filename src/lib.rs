//! `herald`: внутрипроцессная шина publish/subscribe с семантикой
//! Redis-клиента: точные каналы и regex-шаблоны, счётчик подписок и
//! локальные события подписчика.

/// Settings loading (defaults, file, `HERALD__*` environment).
pub mod config;
/// Logging initialization (formatting, filters, sinks).
pub mod logging;
/// Pub/Sub: MatchingBus, Publisher, Subscriber, events.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::Settings;
/// Error handling shared with the `herald-error` crate.
pub use herald_error::{HeraldResult, ListenerError, PubSubError, StackError, StatusCode};
/// Logging entry point and configuration.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
/// Pub/Sub API.
pub use pubsub::{
    create_publisher, create_subscriber, init_shared_bus, shared_bus, Binding, BusConfig,
    Delivery, EventKind, FailurePolicy, IntoPattern, LifecycleKind, LifecycleSignal,
    MatchingBus, Message, Pattern, Payload, Publisher, Subscriber, SubscriberEvent,
};
