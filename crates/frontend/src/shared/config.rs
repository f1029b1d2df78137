use std::time::Duration;

/// Фиксированные параметры слоя согласованности
///
/// TTL задаётся на экземпляр кэша и не меняется при вызове `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyConfig {
    /// TTL полного списка паллет
    pub pallets_ttl: Duration,
    /// TTL сводки по паллетам
    pub summary_ttl: Duration,
    /// Задержка перед отправкой правки строки
    pub debounce: Duration,
    /// Сколько держать статус "сохранено"
    pub success_decay: Duration,
    /// Сколько держать статус "ошибка"
    pub error_decay: Duration,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            pallets_ttl: Duration::from_secs(180),
            summary_ttl: Duration::from_secs(120),
            debounce: Duration::from_millis(500),
            success_decay: Duration::from_secs(2),
            error_decay: Duration::from_secs(3),
        }
    }
}
