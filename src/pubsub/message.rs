use std::sync::Arc;

use bytes::Bytes;

/// Полезная нагрузка сообщения.
///
/// `Bytes` клонируется за O(1), поэтому одна публикация раздаётся тысячам
/// слушателей без копирования данных.
pub type Payload = Bytes;

/// Сообщение, опубликованное в канал.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: Arc<str>,
    pub payload: Payload,
}

impl Message {
    pub fn new(channel: impl Into<Arc<str>>, payload: impl Into<Payload>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Полезная нагрузка как UTF-8 строка (с заменой невалидных байтов).
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
