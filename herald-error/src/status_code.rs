use std::fmt;

use num_enum::IntoPrimitive;
use strum_macros::AsRefStr;

/// Коды статуса ошибок шины.
///
/// # Диапазоны:
/// - 1xxx: конфигурация и внутренние сбои
/// - 2xxx: подписки и каналы
/// - 9xxx: слушатели
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    Internal = 1003,
    InvalidConfig = 1005,

    AlreadyExists = 2001,
    InvalidPattern = 2002,

    ListenerFailed = 9000,
}

/// Уровень, на котором шина пишет ошибку в журнал.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl StatusCode {
    /// Числовое представление кода статуса.
    pub fn code(self) -> u32 {
        self.into()
    }

    /// Уровень логирования для ошибки с этим кодом.
    ///
    /// Отказ слушателя, помеченный как [`StatusCode::Internal`], пишется как
    /// `ERROR`; обычный отказ слушателя только как `WARN`.
    pub fn log_level(self) -> LogLevel {
        match self {
            Self::AlreadyExists => LogLevel::Debug,
            Self::InvalidPattern | Self::InvalidConfig => LogLevel::Info,
            Self::ListenerFailed => LogLevel::Warn,
            Self::Internal => LogLevel::Error,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_ref(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(StatusCode::InvalidConfig.code(), 1005);
        assert_eq!(StatusCode::InvalidPattern.code(), 2002);
        assert_eq!(StatusCode::ListenerFailed.code(), 9000);
    }

    /// Тест проверяет, что отказ слушателя тише внутреннего сбоя, но громче
    /// ошибок подписки.
    #[test]
    fn test_log_level_mappings() {
        assert_eq!(StatusCode::AlreadyExists.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::InvalidPattern.log_level(), LogLevel::Info);
        assert_eq!(StatusCode::ListenerFailed.log_level(), LogLevel::Warn);
        assert_eq!(StatusCode::Internal.log_level(), LogLevel::Error);
    }

    /// Тест проверяет формат `Display`: строка содержит имя варианта и код.
    #[test]
    fn test_display_contains_name_and_code() {
        assert_eq!(StatusCode::ListenerFailed.to_string(), "ListenerFailed (9000)");
    }
}
