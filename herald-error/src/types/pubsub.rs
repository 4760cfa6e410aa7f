use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки подсистемы Pub/Sub.
#[derive(Debug, Clone, Error)]
pub enum PubSubError {
    /// Строку не удалось скомпилировать в регулярное выражение.
    #[error("Invalid channel pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    /// Слушатель вернул ошибку при `FailurePolicy::Propagate`.
    #[error("Listener for '{binding}' failed: {reason}")]
    ListenerFailed { binding: String, reason: String },
    /// Общая шина уже создана, повторная инициализация невозможна.
    #[error("Shared bus is already initialized")]
    BusAlreadyInitialized,
}

/// Ошибка, возвращаемая слушателем шины или обработчиком события подписчика.
///
/// Обычный отказ имеет код [`StatusCode::ListenerFailed`] и пишется в журнал
/// как `WARN`. [`ListenerError::internal`] помечает сбой, после которого
/// слушатель неработоспособен; такой отказ пишется как `ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
    code: StatusCode,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: StatusCode::ListenerFailed,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: StatusCode::Internal,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl ErrorExt for PubSubError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPattern { .. } => StatusCode::InvalidPattern,
            Self::ListenerFailed { .. } => StatusCode::ListenerFailed,
            Self::BusAlreadyInitialized => StatusCode::AlreadyExists,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for ListenerError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
