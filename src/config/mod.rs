//! Конфигурация приложения: значения по умолчанию, необязательный файл и
//! переменные окружения `HERALD__*`.

pub mod settings;

pub use settings::{Settings, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE, ENV_PREFIX};
