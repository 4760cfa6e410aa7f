use std::{env, path::PathBuf};

use herald_error::{ensure, HeraldResult, StatusCode};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing_subscriber::EnvFilter;

/// Формат вывода логов.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Периодичность ротации файла логов.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Настройки файлового sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub dir: PathBuf,
    pub filename: String,
    pub rotation: Rotation,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            filename: "herald.log".to_string(),
            rotation: Rotation::Daily,
        }
    }
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень (`info`) или полная директива `EnvFilter` (`warn,herald=debug`).
    pub level: String,
    pub format: LogFormat,
    pub console_enabled: bool,
    pub with_target: bool,
    pub with_ansi: bool,
    pub with_thread_ids: bool,
    /// Файловый sink; `None` отключает запись в файл.
    pub file: Option<FileSinkConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            console_enabled: true,
            with_target: true,
            with_ansi: true,
            with_thread_ids: false,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Директива для `EnvFilter`.
    ///
    /// Голый уровень применяется ко всем целям, строка с `=` или `,`
    /// передаётся как есть.
    pub fn build_filter_directive(&self) -> String {
        self.level.trim().to_string()
    }

    /// Короткие переменные `HERALD_LOG_LEVEL` и `HERALD_LOG_FORMAT`
    /// перекрывают значения из файла.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("HERALD_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("HERALD_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.format = format,
                Err(_) => eprintln!("Ignoring unknown HERALD_LOG_FORMAT value '{format}'"),
            }
        }
    }

    pub fn validate(&self) -> HeraldResult<()> {
        let directive = self.build_filter_directive();
        ensure!(
            !directive.is_empty(),
            StatusCode::InvalidConfig,
            "logging.level must not be empty"
        );
        ensure!(
            EnvFilter::try_new(&directive).is_ok(),
            StatusCode::InvalidConfig,
            "logging.level '{}' is not a valid filter directive",
            directive
        );
        if let Some(file) = &self.file {
            ensure!(
                !file.filename.trim().is_empty(),
                StatusCode::InvalidConfig,
                "logging.file.filename must not be empty"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.build_filter_directive(), "info");
        assert_eq!(cfg.format, LogFormat::Compact);
        assert!(cfg.file.is_none());
        assert!(cfg.validate().is_ok());
    }

    /// Тест проверяет, что полная директива передаётся без изменений.
    #[test]
    fn test_full_directive_passthrough() {
        let cfg = LoggingConfig {
            level: " warn,herald=debug ".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.build_filter_directive(), "warn,herald=debug");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_directive() {
        let cfg = LoggingConfig {
            level: "herald=loud".to_string(),
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);

        let empty = LoggingConfig {
            level: "  ".to_string(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>().ok(), Some(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }

    /// Тест проверяет перекрытие уровня и формата переменными окружения.
    #[test]
    #[serial]
    fn test_apply_env_overrides() {
        env::set_var("HERALD_LOG_LEVEL", "trace");
        env::set_var("HERALD_LOG_FORMAT", "json");

        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();

        env::remove_var("HERALD_LOG_LEVEL");
        env::remove_var("HERALD_LOG_FORMAT");

        assert_eq!(cfg.level, "trace");
        assert_eq!(cfg.format, LogFormat::Json);
    }
}
