//! Внутрипроцессная шина publish/subscribe.
//!
//! - `bus`: [`MatchingBus`], реестр слушателей с точной и regex-маршрутизацией.
//! - `event`: локальные события подписчика и [`EventEmitter`].
//! - `message`: [`Message`] и тип полезной нагрузки.
//! - `pattern`: [`Pattern`], шаблон канала на основе `regex`.
//! - `publisher`, `subscriber`: клиентские стороны шины.
//! - `shared`: общая шина процесса и фабрика клиентов.

pub mod bus;
pub mod event;
pub mod message;
pub mod pattern;
pub mod publisher;
pub mod shared;
pub mod subscriber;

pub use bus::*;
pub use event::*;
pub use message::*;
pub use pattern::*;
pub use publisher::*;
pub use shared::*;
pub use subscriber::*;
