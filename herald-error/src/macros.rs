/// Немедленно возвращает ошибку (аналогично `anyhow::bail!`).
///
/// Макрос возвращает `Err(StackError)` из текущей функции. Поддерживает три
/// формы:
/// - `bail!(err)`: принимает уже готовый тип ошибки;
/// - `bail!(code, "msg")`: создаёт `GenericError` с кодом и сообщением;
/// - `bail!(code, "fmt {}", arg)`: форматирует сообщение.
///
/// Пример:
///
/// ```ignore
/// use herald_error::{bail, StatusCode};
///
/// fn validate_level(level: &str) -> herald_error::HeraldResult<()> {
///     if level.is_empty() {
///         bail!(StatusCode::InvalidConfig, "Log level cannot be empty");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($crate::StackError::from($err))
    };
    ($code:expr, $msg:expr) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, $msg)
        ))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::StackError::new(
            $crate::types::GenericError::new($code, format!($fmt, $($arg)*))
        ))
    };
}

/// Проверяет условие и вызывает `bail!`, если условие ложно.
///
/// ```ignore
/// use herald_error::{ensure, StatusCode};
///
/// fn check_threshold(threshold: usize) -> herald_error::HeraldResult<()> {
///     ensure!(threshold > 0, StatusCode::InvalidConfig, "Threshold must be positive");
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
    ($cond:expr, $code:expr, $msg:expr) => {
        if !($cond) {
            $crate::bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($code, $fmt, $($arg)*);
        }
    };
}

/// Трейт-расширение для `Result`, добавляющее методы контекстирования.
///
/// Ошибка превращается в [`StackError`](crate::StackError), к ней
/// приклеивается контекст с местом вызова `.context(...)`.
pub trait ResultExt<T> {
    /// Добавляет контекст к ошибке.
    fn context<C: Into<String>>(self, ctx: C) -> Result<T, crate::StackError>;

    /// Добавляет ленивый контекст (вызывается только в случае ошибки).
    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T, crate::StackError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<crate::StackError>,
{
    #[track_caller]
    fn context<C: Into<String>>(self, ctx: C) -> Result<T, crate::StackError> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(e.into().context(ctx)),
        }
    }

    #[track_caller]
    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T, crate::StackError> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(e.into().context(f())),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenericError, HeraldResult, PubSubError, StatusCode};

    #[test]
    fn test_bail_simple() {
        fn example() -> HeraldResult<()> {
            bail!(PubSubError::BusAlreadyInitialized);
        }

        let err = example().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::AlreadyExists);
    }

    #[test]
    fn test_bail_with_format() {
        fn example(value: usize) -> HeraldResult<()> {
            bail!(StatusCode::InvalidConfig, "Invalid threshold: {}", value);
        }

        let err = example(0).unwrap_err();
        assert!(err.to_string().contains("Invalid threshold: 0"));
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }

    #[test]
    fn test_ensure() {
        fn validate(x: usize) -> HeraldResult<()> {
            ensure!(x > 0, StatusCode::InvalidConfig, "Value must be positive");
            ensure!(x < 100, StatusCode::InvalidConfig, "Value too large: {}", x);
            Ok(())
        }

        assert!(validate(50).is_ok());
        assert!(validate(0).is_err());
        assert!(validate(150).is_err());
    }

    #[test]
    fn test_result_ext() {
        fn inner() -> Result<(), GenericError> {
            Err(GenericError::new(StatusCode::Internal, "inner error"))
        }

        fn outer() -> HeraldResult<()> {
            inner().context("outer context")?;
            Ok(())
        }

        let err = outer().unwrap_err();
        assert_eq!(err.contexts().len(), 1);
        assert_eq!(err.contexts()[0].message, "outer context");
        assert_eq!(err.contexts()[0].location.file(), file!());
    }

    #[test]
    fn test_with_context_lazy() {
        fn example(success: bool) -> HeraldResult<()> {
            let result: Result<(), GenericError> = if success {
                Ok(())
            } else {
                Err(GenericError::new(StatusCode::Internal, "error"))
            };

            result.with_context(|| "expensive context".to_string())?;
            Ok(())
        }

        assert!(example(true).is_ok());
        assert!(example(false).is_err());
    }
}
