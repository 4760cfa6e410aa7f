use std::sync::Arc;

use herald_error::HeraldResult;

use super::{MatchingBus, Payload};

/// Публикующая сторона шины. Состояния не держит, дёшево клонируется.
#[derive(Clone, Debug)]
pub struct Publisher {
    bus: Arc<MatchingBus>,
}

impl Publisher {
    pub fn new(bus: Arc<MatchingBus>) -> Self {
        Self { bus }
    }

    /// Публикует сообщение и возвращает число получивших его слушателей.
    ///
    /// Канал без подписчиков не ошибка: результат будет `Ok(0)`.
    pub fn publish(
        &self,
        channel: impl AsRef<str>,
        payload: impl Into<Payload>,
    ) -> HeraldResult<usize> {
        self.bus.publish(channel.as_ref(), payload.into())
    }

    pub fn bus(&self) -> &Arc<MatchingBus> {
        &self.bus
    }
}
