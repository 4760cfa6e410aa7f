use std::{
    env,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File};
use herald_error::{GenericError, HeraldResult, ResultExt, StackError, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{logging::LoggingConfig, pubsub::BusConfig};

/// Префикс переменных окружения: `HERALD__BUS__FAILURE_POLICY=propagate`.
pub const ENV_PREFIX: &str = "HERALD";
/// Переменная с путём к файлу конфигурации.
pub const CONFIG_PATH_ENV: &str = "HERALD_CONFIG";
/// Файл конфигурации, который читается, если он есть в рабочем каталоге.
pub const DEFAULT_CONFIG_FILE: &str = "herald.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bus: BusConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки: значения по умолчанию, затем файл, затем
    /// переменные окружения.
    ///
    /// Файл из `HERALD_CONFIG` обязан существовать; `herald.toml` в рабочем
    /// каталоге необязателен.
    pub fn load() -> HeraldResult<Self> {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::build(Some(PathBuf::from(path)), true),
            Err(_) => Self::build(Some(PathBuf::from(DEFAULT_CONFIG_FILE)), false),
        }
    }

    /// Загружает настройки из указанного файла (плюс окружение).
    pub fn load_from(path: impl AsRef<Path>) -> HeraldResult<Self> {
        Self::build(Some(path.as_ref().to_path_buf()), true)
    }

    fn build(file: Option<PathBuf>, required: bool) -> HeraldResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = &file {
            builder = builder.add_source(File::from(path.as_path()).required(required));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|cfg| cfg.try_deserialize::<Settings>())
            .map_err(config_error)
            .with_context(|| match &file {
                Some(path) => format!("loading settings (file: {})", path.display()),
                None => "loading settings".to_string(),
            })?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> HeraldResult<()> {
        self.bus.validate().context("bus")?;
        self.logging.validate().context("logging")?;
        Ok(())
    }
}

fn config_error(err: ConfigError) -> StackError {
    StackError::new(GenericError::new(StatusCode::InvalidConfig, err.to_string()))
}
