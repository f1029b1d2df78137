use chrono::{DateTime, Utc};
use std::time::Duration;

/// Запись кэша. Принадлежит только кэшу: наружу отдаётся клон значения.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(key: String, value: T, stored_at: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            stored_at,
        }
    }

    /// Запись валидна, пока `now - stored_at < ttl`
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now - self.stored_at;
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age < ttl,
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entry_expires_exactly_at_ttl() {
        let stored_at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let entry = CacheEntry::new("pallets".to_string(), 1, stored_at);
        let ttl = Duration::from_secs(120);

        assert!(entry.is_valid(stored_at + chrono::Duration::seconds(119), ttl));
        assert!(!entry.is_valid(stored_at + chrono::Duration::seconds(120), ttl));
    }
}
