use std::sync::Arc;

use herald_error::{HeraldResult, PubSubError};
use once_cell::sync::OnceCell;
use tracing::info;

use super::{BusConfig, MatchingBus, Publisher, Subscriber};

/// Общая шина процесса. Создаётся один раз и живёт до завершения процесса.
static SHARED_BUS: OnceCell<Arc<MatchingBus>> = OnceCell::new();

/// Возвращает общую шину, создавая её с настройками по умолчанию при первом
/// обращении.
pub fn shared_bus() -> Arc<MatchingBus> {
    SHARED_BUS
        .get_or_init(|| {
            info!("shared bus created with default config");
            Arc::new(MatchingBus::new())
        })
        .clone()
}

/// Настраивает общую шину до первого использования.
///
/// Если шина уже создана (явно или первым вызовом [`shared_bus`]),
/// возвращает [`PubSubError::BusAlreadyInitialized`].
pub fn init_shared_bus(config: BusConfig) -> HeraldResult<Arc<MatchingBus>> {
    config.validate()?;
    let bus = Arc::new(MatchingBus::with_config(config));
    SHARED_BUS
        .set(bus.clone())
        .map_err(|_| PubSubError::BusAlreadyInitialized)?;
    info!(config = ?bus.config(), "shared bus initialized");
    Ok(bus)
}

/// Создаёт публикатора на общей шине.
pub fn create_publisher() -> Publisher {
    Publisher::new(shared_bus())
}

/// Создаёт подписчика на общей шине.
pub fn create_subscriber() -> Subscriber {
    Subscriber::new(shared_bus())
}
