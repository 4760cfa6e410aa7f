use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления lifecycle логирования.
///
/// Держит guard неблокирующего файлового writer'а: пока handle жив, фоновый
/// поток пишет в файл. Drop сбрасывает буфер.
#[derive(Debug)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Явное завершение: сбрасывает буферы файлового sink.
    pub fn shutdown(mut self) {
        tracing::info!(file_sink = self.has_file_sink(), "Logging shutdown");
        drop(self.file_guard.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_without_file_sink() {
        let handle = LoggingHandle::new(None);
        assert!(!handle.has_file_sink());
        handle.shutdown();
    }

    /// Тест проверяет, что shutdown сбрасывает буфер файлового writer'а.
    #[test]
    fn test_shutdown_flushes_file_writer() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let appender = tracing_appender::rolling::never(dir.path(), "flush.log");
        let (mut writer, guard) = tracing_appender::non_blocking(appender);

        let handle = LoggingHandle::new(Some(guard));
        assert!(handle.has_file_sink());
        writer.write_all(b"last line\n").unwrap();
        handle.shutdown();

        let written = std::fs::read_to_string(dir.path().join("flush.log")).unwrap();
        assert_eq!(written, "last line\n");
    }
}
