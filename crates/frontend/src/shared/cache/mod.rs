//! TTL-кэш с объединением одновременных запросов (single-flight)
//!
//! Несколько экранов читают полный список паллет одновременно. Кэш отдаёт
//! валидную запись без сети, а пока запрос в полёте - все вызывающие ждут
//! один и тот же future и получают одно и то же значение.

mod entry;

use contracts::shared::errors::InventoryError;
use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use self::entry::CacheEntry;
use crate::shared::clock::Clock;

type Flight<T, E> = Shared<LocalBoxFuture<'static, Result<T, E>>>;

/// Запрос в полёте; удаляется при завершении независимо от результата
struct InFlight<T: Clone, E: Clone> {
    id: u64,
    future: Flight<T, E>,
}

struct CacheState<T: Clone, E: Clone> {
    entries: HashMap<String, CacheEntry<T>>,
    in_flight: HashMap<String, InFlight<T, E>>,
    next_flight_id: u64,
    /// Меняется при `reset()`: запросы старой эпохи не пишут в кэш
    epoch: u64,
}

/// Кэш, который можно сбросить целиком (узел графа зависимостей)
pub trait Invalidate {
    fn name(&self) -> &str;
    fn invalidate_all(&self);
}

pub struct TtlCache<T: Clone + 'static, E: Clone + 'static = InventoryError> {
    name: &'static str,
    ttl: Duration,
    clock: Rc<dyn Clock>,
    state: Rc<RefCell<CacheState<T, E>>>,
}

impl<T: Clone + 'static, E: Clone + 'static> Clone for TtlCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            ttl: self.ttl,
            clock: Rc::clone(&self.clock),
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> TtlCache<T, E> {
    pub fn new(name: &'static str, ttl: Duration, clock: Rc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            state: Rc::new(RefCell::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                next_flight_id: 0,
                epoch: 0,
            })),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Получить значение по ключу
    ///
    /// - валидная запись - возвращается без вызова `fetcher`;
    /// - запрос в полёте - ждём его же, новый запрос не создаётся;
    /// - иначе вызываем `fetcher`. Успех сохраняется со свежей меткой времени,
    ///   ошибка не сохраняется и получает её каждый ожидающий.
    pub async fn get<F, Fut>(&self, key: &str, fetcher: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        let pending = {
            let mut state = self.state.borrow_mut();
            let now = self.clock.now();

            let expired = match state.entries.get(key) {
                Some(entry) if entry.is_valid(now, self.ttl) => {
                    log::debug!("[cache:{}] hit '{}'", self.name, entry.key);
                    return Ok(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                log::debug!("[cache:{}] expired '{}'", self.name, key);
                state.entries.remove(key);
            }

            state.in_flight.get(key).map(|flight| flight.future.clone())
        };

        if let Some(flight) = pending {
            log::debug!("[cache:{}] joined in-flight request '{}'", self.name, key);
            return flight.await;
        }

        log::debug!("[cache:{}] miss '{}', fetching", self.name, key);
        let request = fetcher();

        let flight = {
            let mut state = self.state.borrow_mut();
            let id = state.next_flight_id;
            state.next_flight_id += 1;
            let future = settle(
                Rc::downgrade(&self.state),
                Rc::clone(&self.clock),
                self.name,
                key.to_string(),
                id,
                state.epoch,
                request,
            )
            .boxed_local()
            .shared();
            state.in_flight.insert(
                key.to_string(),
                InFlight {
                    id,
                    future: future.clone(),
                },
            );
            future
        };

        flight.await
    }

    /// Валидное значение без запроса
    pub fn peek(&self, key: &str) -> Option<T> {
        let state = self.state.borrow();
        let now = self.clock.now();
        state
            .entries
            .get(key)
            .filter(|entry| entry.is_valid(now, self.ttl))
            .map(|entry| entry.value.clone())
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.state.borrow().in_flight.contains_key(key)
    }

    /// Удалить запись. Запрос в полёте не отменяется: его результат
    /// будет сохранён, когда придёт.
    pub fn invalidate(&self, key: &str) {
        if self.state.borrow_mut().entries.remove(key).is_some() {
            log::debug!("[cache:{}] invalidated '{}'", self.name, key);
        }
    }

    /// Полный сброс для тестов: записи, запросы в полёте и их будущие результаты
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.entries.clear();
        state.in_flight.clear();
        state.epoch += 1;
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Invalidate for TtlCache<T, E> {
    fn name(&self) -> &str {
        self.name
    }

    fn invalidate_all(&self) {
        let mut state = self.state.borrow_mut();
        let count = state.entries.len();
        state.entries.clear();
        log::debug!("[cache:{}] invalidated all ({} entries)", self.name, count);
    }
}

/// Обёртка над запросом: по завершении снимает отметку "в полёте"
/// и сохраняет успешный результат
async fn settle<T: Clone + 'static, E: Clone + 'static>(
    state: Weak<RefCell<CacheState<T, E>>>,
    clock: Rc<dyn Clock>,
    name: &'static str,
    key: String,
    id: u64,
    epoch: u64,
    request: impl Future<Output = Result<T, E>>,
) -> Result<T, E> {
    let result = request.await;

    if let Some(state) = state.upgrade() {
        let mut state = state.borrow_mut();
        if state.in_flight.get(&key).map(|flight| flight.id) == Some(id) {
            state.in_flight.remove(&key);
        }
        match &result {
            Ok(value) if state.epoch == epoch => {
                let stored_at = clock.now();
                state
                    .entries
                    .insert(key.clone(), CacheEntry::new(key, value.clone(), stored_at));
            }
            Ok(_) => log::debug!("[cache:{}] dropped result of a reset request", name),
            Err(_) => log::debug!("[cache:{}] request for '{}' failed, not cached", name, key),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::clock::testing::TokioClock;
    use std::cell::Cell;

    const TTL: Duration = Duration::from_secs(180);

    fn cache() -> TtlCache<Vec<String>> {
        TtlCache::new("pallets", TTL, Rc::new(TokioClock::new()))
    }

    /// Fetcher, считающий вызовы; ответ приходит через 100 мс
    fn counting_fetcher(
        calls: &Rc<Cell<usize>>,
        result: Result<Vec<String>, InventoryError>,
    ) -> impl FnOnce() -> LocalBoxFuture<'static, Result<Vec<String>, InventoryError>> {
        let calls = Rc::clone(calls);
        move || {
            calls.set(calls.get() + 1);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                result
            }
            .boxed_local()
        }
    }

    fn pallets() -> Vec<String> {
        vec!["P-001".to_string(), "P-002".to_string()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_fetch() {
        let cache = cache();
        let calls = Rc::new(Cell::new(0));

        let (a, b, c) = futures::join!(
            cache.get("all", counting_fetcher(&calls, Ok(pallets()))),
            cache.get("all", counting_fetcher(&calls, Ok(pallets()))),
            cache.get("all", counting_fetcher(&calls, Ok(pallets()))),
        );

        assert_eq!(calls.get(), 1);
        assert_eq!(a.unwrap(), pallets());
        assert_eq!(b.unwrap(), pallets());
        assert_eq!(c.unwrap(), pallets());
        assert!(!cache.is_in_flight("all"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_entry_served_without_fetch() {
        let cache = cache();
        let calls = Rc::new(Cell::new(0));

        cache
            .get("all", counting_fetcher(&calls, Ok(pallets())))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        let again = cache
            .get("all", counting_fetcher(&calls, Ok(vec![])))
            .await
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(again, pallets());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let cache = cache();
        let calls = Rc::new(Cell::new(0));

        cache
            .get("all", counting_fetcher(&calls, Ok(pallets())))
            .await
            .unwrap();
        tokio::time::advance(TTL).await;
        assert!(cache.peek("all").is_none());

        let fresh = cache
            .get("all", counting_fetcher(&calls, Ok(vec!["P-003".to_string()])))
            .await
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(fresh, vec!["P-003".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_all_waiters_and_is_not_cached() {
        let cache = cache();
        let calls = Rc::new(Cell::new(0));
        let failure = Err(InventoryError::network("connection reset"));

        let (a, b) = futures::join!(
            cache.get("all", counting_fetcher(&calls, failure.clone())),
            cache.get("all", counting_fetcher(&calls, failure.clone())),
        );
        assert_eq!(calls.get(), 1);
        assert_eq!(a.unwrap_err(), InventoryError::network("connection reset"));
        assert_eq!(b.unwrap_err(), InventoryError::network("connection reset"));
        assert!(!cache.is_in_flight("all"));
        assert!(cache.peek("all").is_none());

        let retried = cache
            .get("all", counting_fetcher(&calls, Ok(pallets())))
            .await;
        assert_eq!(calls.get(), 2);
        assert!(retried.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_does_not_cancel_in_flight_request() {
        let cache = cache();
        let calls = Rc::new(Cell::new(0));

        let (value, _) = futures::join!(
            cache.get("all", counting_fetcher(&calls, Ok(pallets()))),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert!(cache.is_in_flight("all"));
                cache.invalidate_all();
            },
        );

        assert!(value.is_ok());
        assert_eq!(cache.peek("all"), Some(pallets()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_late_results() {
        let cache = cache();
        let calls = Rc::new(Cell::new(0));

        let (value, _) = futures::join!(
            cache.get("all", counting_fetcher(&calls, Ok(pallets()))),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cache.reset();
            },
        );

        assert!(value.is_ok());
        assert!(cache.peek("all").is_none());
        assert!(!cache.is_in_flight("all"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let cache = cache();
        let calls = Rc::new(Cell::new(0));

        let _ = futures::join!(
            cache.get("partial", counting_fetcher(&calls, Ok(pallets()))),
            cache.get("complete", counting_fetcher(&calls, Ok(vec![]))),
        );
        assert_eq!(calls.get(), 2);

        cache.invalidate("partial");
        assert!(cache.peek("partial").is_none());
        assert_eq!(cache.peek("complete"), Some(vec![]));
    }
}
