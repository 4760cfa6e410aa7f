use std::{fmt, sync::Arc};

use herald_error::{HeraldResult, PubSubError};
use indexmap::IndexMap;
use tracing::{debug, trace};

use super::{
    listener, Binding, Delivery, EventEmitter, EventKind, HandlerId,
    IntoPattern, ListenerId, ListenerResult, MatchingBus, Pattern, SubscriberEvent,
};

/// Подписчик с семантикой Redis-клиента поверх [`MatchingBus`].
///
/// Держит не более одной подписки на каждый канал и на каждый шаблон,
/// считает их и сообщает о каждом изменении локальным событием
/// (`subscribe`, `unsubscribe`, `psubscribe`, `punsubscribe`). Полученные
/// данные приходят событиями `message` и `pmessage`.
///
/// При `Drop` подписки на шине остаются: их нужно снять явно через
/// [`Subscriber::unsubscribe_all`].
pub struct Subscriber {
    bus: Arc<MatchingBus>,
    emitter: Arc<EventEmitter>,
    count: usize,
    channels: IndexMap<Arc<str>, ListenerId>,
    patterns: IndexMap<Pattern, ListenerId>,
}

impl Subscriber {
    pub fn new(bus: Arc<MatchingBus>) -> Self {
        let emitter = Arc::new(EventEmitter::new(bus.config().failure_policy));
        Self {
            bus,
            emitter,
            count: 0,
            channels: IndexMap::new(),
            patterns: IndexMap::new(),
        }
    }

    /// Подписывается на каналы. Повторная подписка на уже известный канал
    /// ничего не делает.
    pub fn subscribe<I>(&mut self, channels: I) -> HeraldResult<()>
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        for channel in channels {
            let channel = channel.to_string();
            if self.channels.contains_key(channel.as_str()) {
                trace!(channel = %channel, "already subscribed");
                continue;
            }

            let channel = self.bus.channel_key(&channel);
            let emitter = Arc::clone(&self.emitter);
            let id = self.bus.register(
                Binding::Channel(channel.clone()),
                listener(move |delivery| match delivery {
                    Delivery::Message { channel, payload } => {
                        emitter.emit(&SubscriberEvent::Message {
                            channel: Arc::clone(channel),
                            payload: (*payload).clone(),
                        })
                    }
                    Delivery::Lifecycle(_) => Ok(()),
                }),
            );

            self.channels.insert(channel.clone(), id);
            self.count += 1;
            self.notify(SubscriberEvent::Subscribe {
                channel,
                count: self.count,
            })?;
        }
        Ok(())
    }

    /// Отписывается от каналов. Пустой список означает все каналы в порядке
    /// подписки. Неизвестные каналы пропускаются.
    pub fn unsubscribe<I>(&mut self, channels: I) -> HeraldResult<()>
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let mut requested: Vec<String> = channels.into_iter().map(|c| c.to_string()).collect();
        if requested.is_empty() {
            requested = self.channels.keys().map(|c| c.to_string()).collect();
        }

        for channel in requested {
            let Some((channel, id)) = self.channels.shift_remove_entry(channel.as_str()) else {
                trace!(channel = %channel, "not subscribed");
                continue;
            };

            self.bus.unregister(id);
            self.count -= 1;
            self.notify(SubscriberEvent::Unsubscribe {
                channel,
                count: self.count,
            })?;
        }
        Ok(())
    }

    /// Подписывается на шаблоны.
    ///
    /// Все элементы компилируются до изменения состояния: если хотя бы один
    /// шаблон невалиден, возвращается [`PubSubError::InvalidPattern`] и ни
    /// одна подписка не создаётся.
    pub fn psubscribe<I>(&mut self, patterns: I) -> HeraldResult<()>
    where
        I: IntoIterator,
        I::Item: IntoPattern,
    {
        let patterns = collect_patterns(patterns)?;

        for pattern in patterns {
            if self.patterns.contains_key(&pattern) {
                trace!(pattern = %pattern, "already psubscribed");
                continue;
            }

            let emitter = Arc::clone(&self.emitter);
            let matched = pattern.clone();
            let id = self.bus.register(
                Binding::Pattern(pattern.clone()),
                listener(move |delivery| match delivery {
                    Delivery::Message { channel, payload } => {
                        emitter.emit(&SubscriberEvent::PMessage {
                            pattern: matched.clone(),
                            channel: Arc::clone(channel),
                            payload: (*payload).clone(),
                        })
                    }
                    Delivery::Lifecycle(_) => Ok(()),
                }),
            );

            self.patterns.insert(pattern.clone(), id);
            self.count += 1;
            self.notify(SubscriberEvent::PSubscribe {
                pattern,
                count: self.count,
            })?;
        }
        Ok(())
    }

    /// Отписывается от шаблонов. Пустой список означает все шаблоны в порядке
    /// подписки.
    pub fn punsubscribe<I>(&mut self, patterns: I) -> HeraldResult<()>
    where
        I: IntoIterator,
        I::Item: IntoPattern,
    {
        let mut requested = collect_patterns(patterns)?;
        if requested.is_empty() {
            requested = self.patterns.keys().cloned().collect();
        }

        for pattern in requested {
            let Some((pattern, id)) = self.patterns.shift_remove_entry(&pattern) else {
                trace!(pattern = %pattern, "not psubscribed");
                continue;
            };

            self.bus.unregister(id);
            self.count -= 1;
            self.notify(SubscriberEvent::PUnsubscribe {
                pattern,
                count: self.count,
            })?;
        }
        Ok(())
    }

    /// Снимает все подписки: сначала каналы, затем шаблоны.
    pub fn unsubscribe_all(&mut self) -> HeraldResult<()> {
        self.unsubscribe(std::iter::empty::<&str>())?;
        self.punsubscribe(std::iter::empty::<Pattern>())
    }

    /// Текущее число подписок (каналы плюс шаблоны).
    pub fn subscription_count(&self) -> usize {
        self.count
    }

    /// Каналы в порядке подписки.
    pub fn channels(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.keys().map(|c| &**c)
    }

    /// Шаблоны в порядке подписки.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.patterns.keys()
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    pub fn is_psubscribed(&self, pattern: &Pattern) -> bool {
        self.patterns.contains_key(pattern)
    }

    /// Регистрирует локальный обработчик событий вида `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&SubscriberEvent) + Send + Sync + 'static,
    {
        self.emitter.on(kind, handler)
    }

    /// Регистрирует обработчик, который может вернуть ошибку.
    pub fn try_on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&SubscriberEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.emitter.try_on(kind, handler)
    }

    pub fn off(&self, id: HandlerId) -> bool {
        self.emitter.off(id)
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.emitter.handler_count(kind)
    }

    pub fn bus(&self) -> &Arc<MatchingBus> {
        &self.bus
    }

    fn notify(&self, event: SubscriberEvent) -> HeraldResult<()> {
        self.emitter.emit(&event).map_err(|err| {
            PubSubError::ListenerFailed {
                binding: event.binding_label(),
                reason: err.to_string(),
            }
            .into()
        })
    }
}

fn collect_patterns<I>(patterns: I) -> Result<Vec<Pattern>, PubSubError>
where
    I: IntoIterator,
    I::Item: IntoPattern,
{
    patterns.into_iter().map(IntoPattern::into_pattern).collect()
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if self.count > 0 {
            debug!(
                channels = self.channels.len(),
                patterns = self.patterns.len(),
                "subscriber dropped with live subscriptions"
            );
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("count", &self.count)
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("patterns", &self.patterns.keys().collect::<Vec<_>>())
            .finish()
    }
}
