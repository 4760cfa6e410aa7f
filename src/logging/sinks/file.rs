use std::{fs, io};

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::{FileSinkConfig, LoggingConfig, Rotation},
    formatter,
};

/// Файловый layer с неблокирующим writer'ом.
///
/// Guard нужно держать, пока логирование активно: при его drop буфер
/// сбрасывается на диск.
pub fn layer_with_config<S>(
    config: &LoggingConfig,
    file: &FileSinkConfig,
) -> io::Result<(Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fs::create_dir_all(&file.dir)?;

    let appender = match file.rotation {
        Rotation::Daily => rolling::daily(&file.dir, &file.filename),
        Rotation::Hourly => rolling::hourly(&file.dir, &file.filename),
        Rotation::Never => rolling::never(&file.dir, &file.filename),
    };
    let (writer, guard) = non_blocking(appender);

    Ok((formatter::build_formatter(config, writer, false), guard))
}
