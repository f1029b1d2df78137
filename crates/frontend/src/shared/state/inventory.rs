//! Сервисы слоя согласованности для экранов склада
//!
//! Один экземпляр на приложение: кэши, граф зависимостей и шина событий
//! создаются здесь и передаются экранам явно.

use async_trait::async_trait;
use contracts::domain::a001_inbound_order::InboundOrder;
use contracts::domain::a002_pallet::{AddQuantityRequest, Pallet, PalletSummary};
use contracts::domain::a003_customer_order::{AvailabilityQuery, CustomerOrderAvailability};
use contracts::shared::errors::InventoryError;
use std::rc::Rc;

use crate::domain::a001_inbound_order::api as inbound_api;
use crate::domain::a002_pallet::add_quantity::{AddQuantityBackend, AddQuantityFlow};
use crate::domain::a002_pallet::api::{self as pallet_api, PalletEndpoint};
use crate::domain::a003_customer_order::api as customer_order_api;
use crate::shared::cache::TtlCache;
use crate::shared::cache_graph::{CacheGraph, PALLETS_SOURCE, PALLET_SUMMARY_SOURCE};
use crate::shared::clock::{BrowserClock, Clock};
use crate::shared::config::ConsistencyConfig;
use crate::shared::edit_coordinator::{EditCoordinator, EditTimings};
use crate::shared::event_bus::EventBus;
use crate::shared::state::revision::RevisionSignal;

/// Ключ полного списка
const ALL: &str = "all";

#[derive(Clone)]
pub struct InventoryServices {
    pub config: ConsistencyConfig,
    pub clock: Rc<dyn Clock>,
    pub bus: EventBus,
    pub graph: CacheGraph,
    pub pallets: TtlCache<Vec<Pallet>>,
    pub summary: TtlCache<PalletSummary>,
}

impl InventoryServices {
    pub fn new(config: ConsistencyConfig, clock: Rc<dyn Clock>) -> Self {
        let bus = EventBus::new();
        let pallets = TtlCache::new(PALLETS_SOURCE, config.pallets_ttl, Rc::clone(&clock));
        let summary = TtlCache::new(PALLET_SUMMARY_SOURCE, config.summary_ttl, Rc::clone(&clock));
        let graph = CacheGraph::inventory(bus.clone(), pallets.clone(), summary.clone());
        Self {
            config,
            clock,
            bus,
            graph,
            pallets,
            summary,
        }
    }

    /// Сервисы браузера с параметрами по умолчанию
    pub fn browser() -> Self {
        Self::new(ConsistencyConfig::default(), Rc::new(BrowserClock))
    }

    pub async fn pallets(&self) -> Result<Vec<Pallet>, InventoryError> {
        self.pallets.get(ALL, pallet_api::fetch_pallets).await
    }

    pub async fn summary(&self) -> Result<PalletSummary, InventoryError> {
        self.summary.get(ALL, pallet_api::fetch_summary).await
    }

    /// Координатор правок для таблицы паллет; прирост коробок проверяется
    /// по вместимости до отправки
    pub fn pallet_editor(&self, rows: Vec<Pallet>) -> EditCoordinator<Pallet> {
        EditCoordinator::new(
            PALLETS_SOURCE,
            rows,
            Rc::new(PalletEndpoint),
            Rc::clone(&self.clock),
            EditTimings::from(&self.config),
        )
        .with_graph(self.graph.clone())
        .with_validator(Rc::new(self.add_quantity_flow()))
    }

    pub fn add_quantity_flow(&self) -> AddQuantityFlow<InventoryServices> {
        AddQuantityFlow::new(self.clone(), self.graph.clone())
    }

    /// Ревизия списка паллет и сводки (для перечитывания на экранах)
    pub fn pallet_revision(&self) -> RevisionSignal {
        RevisionSignal::watch(&self.bus, &[PALLETS_SOURCE, PALLET_SUMMARY_SOURCE])
    }
}

#[async_trait(?Send)]
impl AddQuantityBackend for InventoryServices {
    async fn pallets(&self) -> Result<Vec<Pallet>, InventoryError> {
        InventoryServices::pallets(self).await
    }

    async fn inbound_order(&self, order_id: &str) -> Result<InboundOrder, InventoryError> {
        inbound_api::fetch_inbound_order(order_id).await
    }

    async fn availability(
        &self,
        customer_order_id: &str,
        query: &AvailabilityQuery,
    ) -> Result<CustomerOrderAvailability, InventoryError> {
        customer_order_api::fetch_availability(customer_order_id, query).await
    }

    async fn add_quantity(
        &self,
        pallet_id: &str,
        request: &AddQuantityRequest,
    ) -> Result<Pallet, InventoryError> {
        pallet_api::post_add_quantity(pallet_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::cache::Invalidate;
    use crate::shared::clock::testing::TokioClock;

    #[tokio::test(start_paused = true)]
    async fn test_pallet_invalidation_clears_summary_and_bumps_revision() {
        let services = InventoryServices::new(
            ConsistencyConfig::default(),
            Rc::new(TokioClock::new()),
        );
        let revision = services.pallet_revision();

        services
            .summary
            .get(ALL, || async { Ok(PalletSummary::default()) })
            .await
            .unwrap();
        assert!(services.summary.peek(ALL).is_some());

        services.graph.invalidate(PALLETS_SOURCE);

        assert!(services.summary.peek(ALL).is_none());
        assert_eq!(revision.get_untracked(), 2);
        assert_eq!(services.pallets.name(), PALLETS_SOURCE);
    }
}
