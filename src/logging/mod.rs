//! Логирование на базе `tracing`.
//!
//! - `config`: [`LoggingConfig`], формат и файловый sink.
//! - `filters`: сборка `EnvFilter` (`RUST_LOG` перекрывает конфигурацию).
//! - `formatter`: fmt-слой под выбранный формат.
//! - `sinks`: console и файловый (`tracing-appender`) слои.
//! - `handle`: [`LoggingHandle`], держит guard файлового writer'а.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{FileSinkConfig, LogFormat, LoggingConfig, Rotation};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация глобального subscriber'а по конфигурации.
///
/// Возвращает ошибку, если конфигурация невалидна, каталог логов не удалось
/// создать или глобальный subscriber уже установлен.
pub fn init_logging(
    mut config: LoggingConfig,
) -> Result<LoggingHandle, Box<dyn std::error::Error + Send + Sync>> {
    config.apply_env_overrides();
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if config.console_enabled {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = match &config.file {
        Some(file) => {
            let (file_layer, guard) = sinks::file::layer_with_config(&config, file)?;
            layers.push(file_layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("HERALD_GIT_COMMIT"),
        level = %config.level,
        format = %config.format,
        console_enabled = config.console_enabled,
        file_enabled = file_guard.is_some(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
