use std::{fmt, panic::Location, sync::Arc};

use crate::{ErrorExt, StatusCode};

/// Ошибка шины с цепочкой контекстов.
///
/// Каждый вызов [`StackError::context`] запоминает сообщение и место вызова,
/// так что по ошибке из `psubscribe` видно, какая операция её породила.
#[derive(Clone)]
pub struct StackError {
    inner: Arc<dyn ErrorExt>,
    contexts: Arc<Vec<ErrorContext>>,
}

/// Один уровень контекста: сообщение и место вызова.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: &'static Location<'static>,
}

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            inner: Arc::new(err),
            contexts: Arc::new(Vec::new()),
        }
    }

    /// Добавляет контекст к ошибке.
    #[track_caller]
    pub fn context(mut self, msg: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.contexts).push(ErrorContext {
            message: msg.into(),
            location: Location::caller(),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    /// Контексты от внутреннего к внешнему.
    pub fn contexts(&self) -> &[ErrorContext] {
        &self.contexts
    }

    /// Попытка downcast к конкретному типу ошибки.
    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locations: Vec<String> = self
            .contexts
            .iter()
            .map(|ctx| format!("{} ({}:{})", ctx.message, ctx.location.file(), ctx.location.line()))
            .collect();
        f.debug_struct("StackError")
            .field("inner", &self.inner.to_string())
            .field("status_code", &self.status_code())
            .field("contexts", &locations)
            .finish()
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in self.contexts.iter().rev() {
            write!(f, "{}: ", ctx.message)?;
        }
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PubSubError;

    fn invalid_pattern() -> PubSubError {
        PubSubError::InvalidPattern {
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
        }
    }

    #[test]
    fn test_context_chain() {
        let stack = StackError::new(invalid_pattern()).context("psubscribe").context("room handler");

        assert_eq!(stack.contexts().len(), 2);
        assert_eq!(stack.contexts()[0].message, "psubscribe");
        assert_eq!(stack.contexts()[0].location.file(), file!());
        assert_eq!(stack.status_code(), StatusCode::InvalidPattern);
    }

    /// Тест проверяет, что внешний контекст печатается первым.
    #[test]
    fn test_display_outermost_first() {
        let stack = StackError::new(invalid_pattern()).context("psubscribe").context("room handler");

        let display = stack.to_string();
        assert!(display.starts_with("room handler: psubscribe: "), "got: {display}");
        assert!(display.ends_with("unclosed group"), "got: {display}");
    }

    /// Тест проверяет, что клон с новым контекстом не меняет исходную ошибку.
    #[test]
    fn test_context_does_not_leak_into_clone() {
        let base = StackError::new(invalid_pattern());
        let extended = base.clone().context("fan-out");

        assert!(base.contexts().is_empty());
        assert_eq!(extended.contexts().len(), 1);
    }

    #[test]
    fn test_downcast() {
        let stack = StackError::from(PubSubError::BusAlreadyInitialized);

        assert!(matches!(stack.downcast_ref::<PubSubError>(), Some(PubSubError::BusAlreadyInitialized)));
        assert!(stack.downcast_ref::<crate::GenericError>().is_none());
    }
}
