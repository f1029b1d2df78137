//! Мост между шиной событий и реактивностью leptos
//!
//! Компонент держит `RevisionSignal` и читает `get()` внутри `Resource`/`Effect`:
//! каждая инвалидация отслеживаемого источника увеличивает ревизию, и данные
//! перечитываются без опроса. Подписка снимается при drop.

use leptos::prelude::*;

use crate::shared::event_bus::{EventBus, EventName, SubscriptionId};

pub struct RevisionSignal {
    revision: RwSignal<u64>,
    bus: EventBus,
    subscription: SubscriptionId,
}

impl RevisionSignal {
    pub fn watch(bus: &EventBus, sources: &[&str]) -> Self {
        let revision = RwSignal::new(0u64);
        let sources: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
        let subscription = bus.on(EventName::CacheInvalidated, move |event| {
            if sources.iter().any(|s| s == event.source()) {
                revision.update(|r| *r += 1);
            }
        });
        Self {
            revision,
            bus: bus.clone(),
            subscription,
        }
    }

    /// Текущая ревизия (отслеживаемое чтение)
    pub fn get(&self) -> u64 {
        self.revision.get()
    }

    pub fn get_untracked(&self) -> u64 {
        self.revision.get_untracked()
    }

    pub fn read_only(&self) -> ReadSignal<u64> {
        self.revision.read_only()
    }
}

impl Drop for RevisionSignal {
    fn drop(&mut self) {
        self.bus.off(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::event_bus::DataEvent;

    fn invalidated(source: &str) -> DataEvent {
        DataEvent::CacheInvalidated {
            source: source.into(),
        }
    }

    #[test]
    fn test_revision_follows_watched_sources() {
        let bus = EventBus::new();
        let revision = RevisionSignal::watch(&bus, &["a002_pallets", "a002_pallet_summary"]);

        bus.emit(invalidated("a002_pallets"));
        bus.emit(invalidated("a002_pallet_summary"));
        bus.emit(invalidated("a001_inbound_orders"));

        assert_eq!(revision.get_untracked(), 2);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        {
            let _revision = RevisionSignal::watch(&bus, &["a002_pallets"]);
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }
}
