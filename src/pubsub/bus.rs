use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use herald_error::{ensure, ErrorExt, HeraldResult, ListenerError, LogLevel, PubSubError, StatusCode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use super::{Pattern, Payload};

/// Результат вызова слушателя шины.
pub type ListenerResult = Result<(), ListenerError>;

/// Слушатель, зарегистрированный на шине.
pub type Listener = Arc<dyn Fn(&Delivery<'_>) -> ListenerResult + Send + Sync>;

/// Оборачивает замыкание в [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Delivery<'_>) -> ListenerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Непрозрачный идентификатор регистрации, уникален в пределах процесса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// К чему привязан слушатель: точное имя канала или шаблон.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    Channel(Arc<str>),
    Pattern(Pattern),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(channel) => f.write_str(channel),
            Self::Pattern(pattern) => write!(f, "{pattern}"),
        }
    }
}

/// Вид служебного сигнала шины о её собственных регистрациях.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    ListenerAdded,
    ListenerRemoved,
}

impl LifecycleKind {
    /// Зарезервированное имя, на котором доставляется сигнал.
    pub const fn channel(self) -> &'static str {
        match self {
            Self::ListenerAdded => NEW_LISTENER,
            Self::ListenerRemoved => REMOVE_LISTENER,
        }
    }
}

/// Имя, на котором слушатели получают [`LifecycleKind::ListenerAdded`].
pub const NEW_LISTENER: &str = "newListener";
/// Имя, на котором слушатели получают [`LifecycleKind::ListenerRemoved`].
pub const REMOVE_LISTENER: &str = "removeListener";

/// Сигнал о добавлении или удалении слушателя.
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    pub kind: LifecycleKind,
    pub binding: Binding,
    pub listener: ListenerId,
}

/// То, что получает слушатель шины.
///
/// Служебные сигналы приходят отдельным вариантом и никогда не выглядят как
/// данные, даже если слушатель подписан на `"newListener"`.
#[derive(Debug, Clone, Copy)]
pub enum Delivery<'a> {
    Message {
        /// Канал, в который опубликовано сообщение (для шаблонных слушателей
        /// это канал, вызвавший совпадение).
        channel: &'a Arc<str>,
        payload: &'a Payload,
    },
    Lifecycle(&'a LifecycleSignal),
}

/// Что делать, если слушатель вернул ошибку.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Залогировать и продолжить раздачу остальным слушателям.
    #[default]
    Isolate,
    /// Прервать раздачу и вернуть ошибку публикующему.
    Propagate,
}

/// Настройки шины.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub failure_policy: FailurePolicy,
    /// Порог числа слушателей на одну привязку, после которого пишется
    /// предупреждение о возможной утечке. Ограничением не является.
    pub listener_warn_threshold: Option<usize>,
}

impl BusConfig {
    pub fn validate(&self) -> HeraldResult<()> {
        ensure!(
            self.listener_warn_threshold != Some(0),
            StatusCode::InvalidConfig,
            "listener_warn_threshold must be positive; omit it to disable the warning"
        );
        Ok(())
    }
}

/// Статистика шины.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Общее количество вызовов `publish`.
    pub published: u64,
    /// Сколько раз слушатели получили сообщение.
    pub delivered: u64,
    /// Сколько вызовов слушателей завершилось ошибкой.
    pub listener_failures: u64,
}

struct ChannelEntry {
    id: ListenerId,
    listener: Listener,
}

struct PatternEntry {
    id: ListenerId,
    pattern: Pattern,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    exact: HashMap<Arc<str>, Vec<ChannelEntry>>,
    patterns: Vec<PatternEntry>,
    bindings: HashMap<ListenerId, Binding>,
}

impl Registry {
    /// Слушатели, которым нужно доставить событие на `channel`: сначала точные
    /// в порядке регистрации, затем шаблонные в порядке регистрации.
    fn snapshot(&self, channel: &str) -> (Option<Arc<str>>, Vec<Listener>) {
        let mut listeners = Vec::new();
        let key = match self.exact.get_key_value(channel) {
            Some((key, entries)) => {
                listeners.extend(entries.iter().map(|e| e.listener.clone()));
                Some(key.clone())
            }
            None => None,
        };
        listeners.extend(
            self.patterns
                .iter()
                .filter(|e| e.pattern.is_match(channel))
                .map(|e| e.listener.clone()),
        );
        (key, listeners)
    }

    fn count_for(&self, binding: &Binding) -> usize {
        match binding {
            Binding::Channel(channel) => self.exact.get(channel).map_or(0, Vec::len),
            Binding::Pattern(pattern) => self
                .patterns
                .iter()
                .filter(|e| &e.pattern == pattern)
                .count(),
        }
    }
}

/// Реестр слушателей с точной и шаблонной (regex) маршрутизацией.
///
/// Публикация синхронна: под read-lock снимается снимок подходящих
/// слушателей, блокировка отпускается, затем слушатели вызываются в потоке
/// публикующего. Поэтому слушатель может сам подписываться и отписываться.
/// Число слушателей не ограничено.
pub struct MatchingBus {
    registry: RwLock<Registry>,
    config: BusConfig,
    published: AtomicU64,
    delivered: AtomicU64,
    listener_failures: AtomicU64,
}

impl MatchingBus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            config,
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            listener_failures: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Регистрирует слушателя на канал или шаблон.
    ///
    /// Сигнал [`LifecycleKind::ListenerAdded`] отправляется до вставки, так что
    /// новый слушатель не видит собственного добавления.
    pub fn register(&self, binding: Binding, listener: Listener) -> ListenerId {
        let id = ListenerId::next();
        self.signal(LifecycleKind::ListenerAdded, &binding, id);

        let count = {
            let mut registry = self.registry.write();
            match &binding {
                Binding::Channel(channel) => registry
                    .exact
                    .entry(channel.clone())
                    .or_default()
                    .push(ChannelEntry { id, listener }),
                Binding::Pattern(pattern) => registry.patterns.push(PatternEntry {
                    id,
                    pattern: pattern.clone(),
                    listener,
                }),
            }
            registry.bindings.insert(id, binding.clone());
            registry.count_for(&binding)
        };

        if let Some(threshold) = self.config.listener_warn_threshold {
            if count == threshold + 1 {
                warn!(
                    binding = %binding,
                    listeners = count,
                    threshold,
                    "possible listener leak: binding exceeded warn threshold"
                );
            }
        }

        debug!(binding = %binding, listener = id.0, "listener registered");
        id
    }

    /// Удаляет слушателя. Возвращает `false`, если такого `id` нет.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let binding = {
            let mut registry = self.registry.write();
            let Some(binding) = registry.bindings.remove(&id) else {
                return false;
            };
            match &binding {
                Binding::Channel(channel) => {
                    if let Some(entries) = registry.exact.get_mut(channel) {
                        entries.retain(|e| e.id != id);
                        if entries.is_empty() {
                            registry.exact.remove(channel);
                        }
                    }
                }
                Binding::Pattern(_) => registry.patterns.retain(|e| e.id != id),
            }
            binding
        };

        debug!(binding = %binding, listener = id.0, "listener unregistered");
        self.signal(LifecycleKind::ListenerRemoved, &binding, id);
        true
    }

    /// Публикует сообщение в канал.
    ///
    /// Возвращает количество слушателей, которым было доставлено сообщение.
    /// При [`FailurePolicy::Propagate`] первая ошибка слушателя прерывает
    /// раздачу.
    pub fn publish(&self, channel: &str, payload: Payload) -> HeraldResult<usize> {
        self.published.fetch_add(1, Ordering::Relaxed);

        let (key, listeners) = self.registry.read().snapshot(channel);
        if listeners.is_empty() {
            trace!(channel, "publish without listeners");
            return Ok(0);
        }

        let channel: Arc<str> = key.unwrap_or_else(|| Arc::from(channel));
        let delivery = Delivery::Message {
            channel: &channel,
            payload: &payload,
        };

        let mut delivered = 0;
        for listener in &listeners {
            let result = listener(&delivery);
            delivered += 1;
            if let Err(err) = result {
                self.listener_failures.fetch_add(1, Ordering::Relaxed);
                match self.config.failure_policy {
                    FailurePolicy::Isolate => {
                        log_listener_failure("publish", &channel, &err);
                    }
                    FailurePolicy::Propagate => {
                        self.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
                        return Err(PubSubError::ListenerFailed {
                            binding: channel.to_string(),
                            reason: err.to_string(),
                        }
                        .into());
                    }
                }
            }
        }

        self.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        trace!(channel = %channel, delivered, "published");
        Ok(delivered)
    }

    /// Имя канала в виде `Arc<str>`.
    ///
    /// Если на канале уже есть слушатели, возвращается ключ реестра, так что
    /// подписчики одного канала делят одну строку. Ключ удаляется из реестра
    /// вместе с последним слушателем канала.
    pub fn channel_key(&self, channel: &str) -> Arc<str> {
        match self.registry.read().exact.get_key_value(channel) {
            Some((key, _)) => key.clone(),
            None => Arc::from(channel),
        }
    }

    /// Количество каналов, на которых есть хотя бы один слушатель.
    pub fn channel_count(&self) -> usize {
        self.registry.read().exact.len()
    }

    /// Количество слушателей на конкретной привязке.
    pub fn listener_count(&self, binding: &Binding) -> usize {
        self.registry.read().count_for(binding)
    }

    /// Общее количество зарегистрированных слушателей.
    pub fn total_listeners(&self) -> usize {
        self.registry.read().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_listeners() == 0
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }

    /// Доставляет служебный сигнал слушателям зарезервированного имени.
    /// Ошибки слушателей здесь только логируются: регистрация не должна
    /// срываться из-за наблюдателя.
    fn signal(&self, kind: LifecycleKind, binding: &Binding, id: ListenerId) {
        let (_, listeners) = self.registry.read().snapshot(kind.channel());
        if listeners.is_empty() {
            return;
        }

        let signal = LifecycleSignal {
            kind,
            binding: binding.clone(),
            listener: id,
        };
        let delivery = Delivery::Lifecycle(&signal);
        for listener in &listeners {
            if let Err(err) = listener(&delivery) {
                log_listener_failure("lifecycle", kind.channel(), &err);
            }
        }
    }
}

/// Пишет проглоченный отказ слушателя в журнал на уровне его статус-кода.
pub(crate) fn log_listener_failure(scope: &'static str, binding: &str, err: &ListenerError) {
    let status = err.status_code();
    match err.log_level() {
        LogLevel::Error => error!(scope, binding, status = %status, error = %err, "listener failed"),
        LogLevel::Warn => warn!(scope, binding, status = %status, error = %err, "listener failed"),
        LogLevel::Info => info!(scope, binding, status = %status, error = %err, "listener failed"),
        LogLevel::Debug => debug!(scope, binding, status = %status, error = %err, "listener failed"),
    }
}

impl Default for MatchingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MatchingBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("MatchingBus")
            .field("channels", &registry.exact.len())
            .field("patterns", &registry.patterns.len())
            .field("listeners", &registry.bindings.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;
    use crate::logging::testing::VecMakeWriter;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Helper: слушатель, записывающий доставки в общий журнал с меткой.
    fn recorder(log: &Log, tag: &'static str) -> Listener {
        let log = log.clone();
        listener(move |delivery| {
            let entry = match delivery {
                Delivery::Message { channel, payload } => {
                    format!("{tag}:{channel}:{}", String::from_utf8_lossy(payload))
                }
                Delivery::Lifecycle(signal) => format!("{tag}:{:?}:{}", signal.kind, signal.binding),
            };
            log.lock().unwrap().push(entry);
            Ok(())
        })
    }

    fn channel(name: &str) -> Binding {
        Binding::Channel(Arc::from(name))
    }

    fn pattern(source: &str) -> Binding {
        Binding::Pattern(Pattern::new(source).unwrap())
    }

    /// Проверяет доставку по точному каналу и отсутствие доставки в чужой.
    #[test]
    fn test_publish_exact_channel() {
        let bus = MatchingBus::new();
        let log = Log::default();
        bus.register(channel("A"), recorder(&log, "l1"));

        assert_eq!(bus.publish("A", Bytes::from_static(b"hello")).unwrap(), 1);
        assert_eq!(bus.publish("B", Bytes::from_static(b"nope")).unwrap(), 0);

        assert_eq!(*log.lock().unwrap(), vec!["l1:A:hello"]);
    }

    /// Проверяет порядок: точные слушатели первыми, затем шаблоны, каждый
    /// в порядке регистрации.
    #[test]
    fn test_dispatch_order_exact_then_patterns() {
        let bus = MatchingBus::new();
        let log = Log::default();
        bus.register(pattern("^news\\."), recorder(&log, "p1"));
        bus.register(channel("news.sports"), recorder(&log, "e1"));
        bus.register(pattern("sports$"), recorder(&log, "p2"));
        bus.register(channel("news.sports"), recorder(&log, "e2"));

        let n = bus.publish("news.sports", Bytes::from_static(b"x")).unwrap();
        assert_eq!(n, 4);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "e1:news.sports:x",
                "e2:news.sports:x",
                "p1:news.sports:x",
                "p2:news.sports:x"
            ]
        );
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let bus = MatchingBus::new();
        let log = Log::default();
        let id = bus.register(channel("A"), recorder(&log, "l"));

        assert!(bus.unregister(id));
        assert!(!bus.unregister(id), "повторное удаление ничего не делает");
        assert_eq!(bus.publish("A", Bytes::from_static(b"x")).unwrap(), 0);
        assert!(bus.is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    /// Проверяет, что служебные сигналы приходят как `Delivery::Lifecycle`.
    #[test]
    fn test_lifecycle_signals_are_typed() {
        let bus = MatchingBus::new();
        let log = Log::default();
        bus.register(channel(NEW_LISTENER), recorder(&log, "added"));
        bus.register(channel(REMOVE_LISTENER), recorder(&log, "removed"));

        let id = bus.register(channel("chat"), recorder(&log, "chat"));
        bus.unregister(id);

        let log = log.lock().unwrap();
        assert!(log.contains(&"added:ListenerAdded:chat".to_string()));
        assert!(log.contains(&"removed:ListenerRemoved:chat".to_string()));
        // Сигналы не попадают в журнал как сообщения канала "chat".
        assert!(log.iter().all(|e| !e.contains(":chat:")));
    }

    /// Проверяет, что обычная публикация на зарезервированное имя остаётся
    /// сообщением.
    #[test]
    fn test_publish_on_reserved_name_is_a_message() {
        let bus = MatchingBus::new();
        let log = Log::default();
        bus.register(channel(NEW_LISTENER), recorder(&log, "l"));
        bus.publish(NEW_LISTENER, Bytes::from_static(b"hi")).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["l:newListener:hi"]);
    }

    #[test]
    fn test_isolate_policy_continues_fanout() {
        let bus = MatchingBus::new();
        let log = Log::default();
        bus.register(channel("A"), listener(|_| Err("boom".into())));
        bus.register(channel("A"), recorder(&log, "ok"));

        assert_eq!(bus.publish("A", Bytes::from_static(b"x")).unwrap(), 2);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(bus.stats().listener_failures, 1);
    }

    #[test]
    fn test_propagate_policy_aborts_fanout() {
        let bus = MatchingBus::with_config(BusConfig {
            failure_policy: FailurePolicy::Propagate,
            ..Default::default()
        });
        let log = Log::default();
        bus.register(channel("A"), listener(|_| Err("boom".into())));
        bus.register(channel("A"), recorder(&log, "never"));

        let err = bus.publish("A", Bytes::from_static(b"x")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ListenerFailed);
        assert!(err.to_string().contains("boom"));
        assert!(matches!(
            err.downcast_ref::<PubSubError>(),
            Some(PubSubError::ListenerFailed { binding, .. }) if binding == "A"
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    /// Проверяет, что проглоченный отказ слушателя пишется в журнал на уровне
    /// его статус-кода: обычный как `WARN`, внутренний как `ERROR`.
    #[test]
    fn test_isolated_failure_logged_at_status_level() {
        let writer = VecMakeWriter::default();
        let subscriber = Registry::default().with(fmt::layer().with_ansi(false).with_writer(writer.clone()));

        let bus = MatchingBus::new();
        bus.register(channel("soft"), listener(|_| Err("socket closed".into())));
        bus.register(channel("hard"), listener(|_| Err(ListenerError::internal("state poisoned"))));

        tracing::subscriber::with_default(subscriber, || {
            bus.publish("soft", Bytes::from_static(b"x")).unwrap();
            bus.publish("hard", Bytes::from_static(b"x")).unwrap();
        });

        let out = writer.contents();
        let soft = out.lines().find(|l| l.contains("socket closed")).unwrap_or_default();
        let hard = out.lines().find(|l| l.contains("state poisoned")).unwrap_or_default();
        assert!(soft.contains("WARN") && soft.contains("ListenerFailed (9000)"), "got: {out}");
        assert!(hard.contains("ERROR") && hard.contains("Internal (1003)"), "got: {out}");
        assert!(soft.contains("scope=\"publish\"") || soft.contains("scope=publish"), "got: {out}");
    }

    /// Проверяет, что шаблон, совпадающий со служебными именами, получает
    /// сигналы только как `Delivery::Lifecycle`.
    #[test]
    fn test_pattern_receives_lifecycle_as_typed_signal() {
        let bus = MatchingBus::new();
        let log = Log::default();
        bus.register(pattern("Listener$"), recorder(&log, "watch"));

        let id = bus.register(channel("chat"), listener(|_| Ok(())));
        bus.unregister(id);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["watch:ListenerAdded:chat", "watch:ListenerRemoved:chat"]
        );
    }

    /// Проверяет, что слушатель может регистрировать новых слушателей во время
    /// раздачи без взаимной блокировки.
    #[test]
    fn test_reentrant_register_from_listener() {
        let bus = Arc::new(MatchingBus::new());
        let log = Log::default();
        let inner_bus = bus.clone();
        let inner_log = log.clone();
        bus.register(
            channel("A"),
            listener(move |_| {
                inner_bus.register(channel("B"), recorder(&inner_log, "late"));
                Ok(())
            }),
        );

        bus.publish("A", Bytes::from_static(b"x")).unwrap();
        assert_eq!(bus.listener_count(&channel("B")), 1);
        bus.publish("B", Bytes::from_static(b"y")).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["late:B:y"]);
    }

    #[test]
    fn test_many_listeners_without_cap() {
        let bus = MatchingBus::with_config(BusConfig {
            listener_warn_threshold: Some(10),
            ..Default::default()
        });
        for _ in 0..5000 {
            bus.register(channel("fan"), listener(|_| Ok(())));
        }
        assert_eq!(bus.publish("fan", Bytes::from_static(b"x")).unwrap(), 5000);
        assert_eq!(bus.stats().delivered, 5000);
    }

    /// Проверяет, что подписчики канала делят ключ реестра, а после ухода
    /// последнего слушателя канал не остаётся в реестре.
    #[test]
    fn test_channel_key_is_shared_and_released() {
        let bus = MatchingBus::new();
        let first = bus.register(channel("room"), listener(|_| Ok(())));

        let key = bus.channel_key("room");
        let second = bus.register(Binding::Channel(key.clone()), listener(|_| Ok(())));
        assert!(Arc::ptr_eq(&key, &bus.channel_key("room")));
        assert_eq!(bus.channel_count(), 1);

        bus.unregister(first);
        bus.unregister(second);
        assert_eq!(bus.channel_count(), 0);
        assert!(!Arc::ptr_eq(&key, &bus.channel_key("room")));
    }

    #[test]
    fn test_config_rejects_zero_threshold() {
        let config = BusConfig {
            listener_warn_threshold: Some(0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
        assert!(BusConfig::default().validate().is_ok());
    }
}
