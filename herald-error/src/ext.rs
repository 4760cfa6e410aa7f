use std::{any::Any, error::Error};

use crate::{LogLevel, StatusCode};

/// Общий трейт ошибок шины (object-safe).
///
/// По статус-коду шина решает, как сообщить об ошибке: вернуть вызывающему
/// коду или записать в журнал с нужным уровнем.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус ошибки. По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`], чтобы [`StackError`](crate::StackError)
    /// мог выполнить downcast к конкретному типу.
    fn as_any(&self) -> &dyn Any;

    /// Уровень логирования, выведенный из статус-кода.
    fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }
}
