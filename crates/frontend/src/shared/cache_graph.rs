//! Граф зависимостей кэшей
//!
//! Сводка по паллетам считается из списка паллет, поэтому сброс кэша паллет
//! обязан в том же вызове сбросить и сводку. После очистки в шину уходит
//! `CacheInvalidated` для каждого очищенного узла (сначала исходный).

use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::shared::cache::Invalidate;
use crate::shared::event_bus::{DataEvent, EventBus};

/// Полный список паллет
pub const PALLETS_SOURCE: &str = "a002_pallets";
/// Производная сводка ("резюме") по паллетам
pub const PALLET_SUMMARY_SOURCE: &str = "a002_pallet_summary";

#[derive(Default)]
struct GraphState {
    nodes: HashMap<String, Rc<dyn Invalidate>>,
    /// источник -> кэши, производные от него
    dependents: HashMap<String, Vec<String>>,
}

#[derive(Clone)]
pub struct CacheGraph {
    bus: EventBus,
    state: Rc<RefCell<GraphState>>,
}

impl CacheGraph {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            state: Rc::new(RefCell::new(GraphState::default())),
        }
    }

    /// Стандартный граф склада: паллеты → сводка
    pub fn inventory(
        bus: EventBus,
        pallets: impl Invalidate + 'static,
        summary: impl Invalidate + 'static,
    ) -> Self {
        let graph = Self::new(bus);
        graph.register(PALLETS_SOURCE, pallets);
        graph.register(PALLET_SUMMARY_SOURCE, summary);
        graph.depends_on(PALLET_SUMMARY_SOURCE, PALLETS_SOURCE);
        graph
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn register(&self, source: &str, cache: impl Invalidate + 'static) {
        self.state
            .borrow_mut()
            .nodes
            .insert(source.to_string(), Rc::new(cache));
    }

    /// `derived` сбрасывается каждый раз, когда сбрасывается `primary`
    pub fn depends_on(&self, derived: &str, primary: &str) {
        let mut state = self.state.borrow_mut();
        let list = state.dependents.entry(primary.to_string()).or_default();
        if !list.iter().any(|d| d == derived) {
            list.push(derived.to_string());
        }
    }

    /// Сбросить источник и всё, что от него зависит (в ширину, без повторов).
    /// Возвращает очищенные источники в порядке очистки.
    pub fn invalidate(&self, source: &str) -> Vec<String> {
        let (cleared, caches) = {
            let state = self.state.borrow();
            if !state.nodes.contains_key(source) {
                log::warn!("[cache-graph] invalidate for unregistered source '{}'", source);
            }

            let mut cleared = Vec::new();
            let mut caches = Vec::new();
            let mut seen = HashSet::new();
            let mut queue = VecDeque::from([source.to_string()]);

            while let Some(current) = queue.pop_front() {
                if !seen.insert(current.clone()) {
                    continue;
                }
                if let Some(cache) = state.nodes.get(&current) {
                    caches.push(Rc::clone(cache));
                }
                if let Some(next) = state.dependents.get(&current) {
                    queue.extend(next.iter().cloned());
                }
                cleared.push(current);
            }
            (cleared, caches)
        };

        for cache in &caches {
            cache.invalidate_all();
        }
        log::info!("[cache-graph] invalidated {:?}", cleared);

        for source in &cleared {
            self.bus.emit(DataEvent::CacheInvalidated {
                source: source.clone(),
            });
        }
        cleared
    }

    /// Сообщить об успешной мутации (без сброса кэшей)
    pub fn notify_updated(&self, source: &str, payload: Value) {
        self.bus.emit(DataEvent::DataUpdated {
            source: source.to_string(),
            payload,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::cache::TtlCache;
    use crate::shared::clock::testing::TokioClock;
    use crate::shared::event_bus::EventName;
    use std::time::Duration;

    struct Fixture {
        graph: CacheGraph,
        pallets: TtlCache<Vec<String>>,
        summary: TtlCache<u32>,
        events: Rc<RefCell<Vec<String>>>,
    }

    async fn fixture() -> Fixture {
        let clock = Rc::new(TokioClock::new());
        let pallets: TtlCache<Vec<String>> =
            TtlCache::new("pallets", Duration::from_secs(180), clock.clone());
        let summary: TtlCache<u32> = TtlCache::new("summary", Duration::from_secs(120), clock);

        pallets
            .get("all", || async { Ok(vec!["P-001".to_string()]) })
            .await
            .unwrap();
        summary.get("all", || async { Ok(1) }).await.unwrap();

        let bus = EventBus::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        bus.on(EventName::CacheInvalidated, move |e| {
            sink.borrow_mut().push(e.source().to_string())
        });

        let graph = CacheGraph::inventory(bus, pallets.clone(), summary.clone());
        Fixture {
            graph,
            pallets,
            summary,
            events,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pallet_invalidation_cascades_to_summary() {
        let f = fixture().await;

        let cleared = f.graph.invalidate(PALLETS_SOURCE);

        assert_eq!(cleared, vec![PALLETS_SOURCE, PALLET_SUMMARY_SOURCE]);
        assert!(f.pallets.peek("all").is_none());
        assert!(f.summary.peek("all").is_none());
        assert_eq!(
            *f.events.borrow(),
            vec![PALLETS_SOURCE.to_string(), PALLET_SUMMARY_SOURCE.to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_invalidation_leaves_pallets() {
        let f = fixture().await;

        f.graph.invalidate(PALLET_SUMMARY_SOURCE);

        assert!(f.pallets.peek("all").is_some());
        assert!(f.summary.peek("all").is_none());
        assert_eq!(*f.events.borrow(), vec![PALLET_SUMMARY_SOURCE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_do_not_loop() {
        let f = fixture().await;
        f.graph.depends_on(PALLETS_SOURCE, PALLET_SUMMARY_SOURCE);

        let cleared = f.graph.invalidate(PALLET_SUMMARY_SOURCE);
        assert_eq!(cleared, vec![PALLET_SUMMARY_SOURCE, PALLETS_SOURCE]);
    }

    #[test]
    fn test_unknown_source_still_emits_event() {
        let bus = EventBus::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        bus.on(EventName::CacheInvalidated, move |_| *counter.borrow_mut() += 1);

        let graph = CacheGraph::new(bus);
        assert_eq!(graph.invalidate("a001_inbound_orders"), vec!["a001_inbound_orders"]);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_notify_updated_carries_payload() {
        let bus = EventBus::new();
        let got = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&got);
        bus.on(EventName::DataUpdated, move |e| {
            if let DataEvent::DataUpdated { payload, .. } = e {
                *sink.borrow_mut() = Some(payload.clone());
            }
        });

        let graph = CacheGraph::new(bus);
        graph.notify_updated(PALLETS_SOURCE, serde_json::json!({"code": "P-001"}));
        assert_eq!(got.borrow().as_ref().unwrap()["code"], "P-001");
    }
}
