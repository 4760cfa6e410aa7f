use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use super::{bus::log_listener_failure, FailurePolicy, ListenerResult, Message, Pattern, Payload};

/// Имена локальных событий подписчика (как у клиента Redis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Message,
    PMessage,
    Subscribe,
    Unsubscribe,
    PSubscribe,
    PUnsubscribe,
}

/// Локальное событие подписчика.
///
/// Счётчик `count` в событиях (p)subscribe/(p)unsubscribe отражает состояние
/// уже после изменения.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberEvent {
    Message {
        channel: Arc<str>,
        payload: Payload,
    },
    PMessage {
        pattern: Pattern,
        channel: Arc<str>,
        payload: Payload,
    },
    Subscribe {
        channel: Arc<str>,
        count: usize,
    },
    Unsubscribe {
        channel: Arc<str>,
        count: usize,
    },
    PSubscribe {
        pattern: Pattern,
        count: usize,
    },
    PUnsubscribe {
        pattern: Pattern,
        count: usize,
    },
}

impl SubscriberEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message { .. } => EventKind::Message,
            Self::PMessage { .. } => EventKind::PMessage,
            Self::Subscribe { .. } => EventKind::Subscribe,
            Self::Unsubscribe { .. } => EventKind::Unsubscribe,
            Self::PSubscribe { .. } => EventKind::PSubscribe,
            Self::PUnsubscribe { .. } => EventKind::PUnsubscribe,
        }
    }

    /// Канал события, если он есть.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Message { channel, .. }
            | Self::PMessage { channel, .. }
            | Self::Subscribe { channel, .. }
            | Self::Unsubscribe { channel, .. } => Some(&**channel),
            Self::PSubscribe { .. } | Self::PUnsubscribe { .. } => None,
        }
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        match self {
            Self::PMessage { pattern, .. }
            | Self::PSubscribe { pattern, .. }
            | Self::PUnsubscribe { pattern, .. } => Some(pattern),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Message { payload, .. } | Self::PMessage { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Число подписок после изменения (только для событий подписки).
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::Subscribe { count, .. }
            | Self::Unsubscribe { count, .. }
            | Self::PSubscribe { count, .. }
            | Self::PUnsubscribe { count, .. } => Some(*count),
            _ => None,
        }
    }

    /// Доставленное сообщение (для `message` и `pmessage`).
    pub fn to_message(&self) -> Option<Message> {
        match self {
            Self::Message { channel, payload } | Self::PMessage { channel, payload, .. } => {
                Some(Message {
                    channel: Arc::clone(channel),
                    payload: payload.clone(),
                })
            }
            _ => None,
        }
    }

    /// Текстовая метка привязки для логов и ошибок.
    pub(crate) fn binding_label(&self) -> String {
        match (self.pattern(), self.channel()) {
            (Some(pattern), _) => pattern.to_string(),
            (None, Some(channel)) => channel.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Обработчик локального события.
pub type Handler = Arc<dyn Fn(&SubscriberEvent) -> ListenerResult + Send + Sync>;

/// Идентификатор обработчика, возвращаемый [`EventEmitter::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Локальный реестр наблюдателей подписчика.
///
/// Обработчики вызываются синхронно, в порядке регистрации; список снимается
/// под блокировкой и вызывается без неё.
pub struct EventEmitter {
    handlers: RwLock<Vec<(HandlerId, EventKind, Handler)>>,
    next_id: AtomicU64,
    policy: FailurePolicy,
}

impl EventEmitter {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            policy,
        }
    }

    /// Регистрирует обработчик, который не может завершиться ошибкой.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&SubscriberEvent) + Send + Sync + 'static,
    {
        self.try_on(kind, move |event| {
            handler(event);
            Ok(())
        })
    }

    /// Регистрирует обработчик, который может вернуть ошибку.
    pub fn try_on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&SubscriberEvent) -> ListenerResult + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, kind, Arc::new(handler)));
        id
    }

    /// Удаляет обработчик. Возвращает `false`, если его уже нет.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(hid, _, _)| *hid != id);
        handlers.len() != before
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    /// Синхронно раздаёт событие обработчикам его вида.
    pub fn emit(&self, event: &SubscriberEvent) -> ListenerResult {
        let kind = event.kind();
        let snapshot: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| h.clone())
            .collect();

        for handler in snapshot {
            if let Err(err) = handler(event) {
                match self.policy {
                    FailurePolicy::Isolate => {
                        log_listener_failure("subscriber", kind.as_ref(), &err);
                    }
                    FailurePolicy::Propagate => return Err(err),
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &self.handlers.read().len())
            .field("policy", &self.policy)
            .finish()
    }
}
