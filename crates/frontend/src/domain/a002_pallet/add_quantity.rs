//! Добавление коробок на открытую паллету
//!
//! Порядок: статус паллеты → корзина классификации по кэшированному списку
//! паллет → свежая доступность заказа клиента → запрос на сервер.
//! Первые проверки отклоняют операцию без сетевой записи.
//!
//! Та же проверка применяется к правке строки таблицы паллет: прирост коробок
//! в полном снимке проверяется как последовательность добавлений.

use async_trait::async_trait;
use contracts::domain::a001_inbound_order::InboundOrder;
use contracts::domain::a002_pallet::{AddQuantityRequest, Pallet, PalletOperation, PalletStatus};
use contracts::domain::a003_customer_order::{AvailabilityQuery, CustomerOrderAvailability};
use contracts::shared::capacity::{self, ClassificationBucket, ValidationResult};
use contracts::shared::errors::InventoryError;
use std::collections::HashMap;

use crate::shared::cache_graph::{CacheGraph, PALLETS_SOURCE};
use crate::shared::edit_coordinator::EditValidator;

/// Источники данных для добавления коробок
#[async_trait(?Send)]
pub trait AddQuantityBackend {
    /// Полный список паллет (через кэш)
    async fn pallets(&self) -> Result<Vec<Pallet>, InventoryError>;

    async fn inbound_order(&self, order_id: &str) -> Result<InboundOrder, InventoryError>;

    /// Доступность по заказу клиента; всегда свежая
    async fn availability(
        &self,
        customer_order_id: &str,
        query: &AvailabilityQuery,
    ) -> Result<CustomerOrderAvailability, InventoryError>;

    async fn add_quantity(
        &self,
        pallet_id: &str,
        request: &AddQuantityRequest,
    ) -> Result<Pallet, InventoryError>;
}

pub struct AddQuantityFlow<B: AddQuantityBackend> {
    backend: B,
    graph: CacheGraph,
}

impl<B: AddQuantityBackend> AddQuantityFlow<B> {
    pub fn new(backend: B, graph: CacheGraph) -> Self {
        Self { backend, graph }
    }

    /// Проверка для диалога: `Err` только для статуса паллеты и ошибок загрузки
    pub async fn check(
        &self,
        pallet: &Pallet,
        request: &AddQuantityRequest,
    ) -> Result<ValidationResult, InventoryError> {
        pallet.ensure_can(PalletOperation::AddQuantity)?;

        let pallets = self.backend.pallets().await?;
        self.evaluate(pallet.customer_order_id.as_deref(), request, &pallets, 0)
            .await
    }

    /// `assigned_before` - коробки, уже учтённые сверх ответа сервера
    async fn evaluate(
        &self,
        customer_order_id: Option<&str>,
        request: &AddQuantityRequest,
        pallets: &[Pallet],
        assigned_before: i64,
    ) -> Result<ValidationResult, InventoryError> {
        let bucket = self.bucket(request, pallets).await?;
        let availability = match customer_order_id {
            Some(customer_order_id) => self
                .availability(customer_order_id, request)
                .await
                .map(|mut availability| {
                    availability.assigned_quantity =
                        availability.assigned_quantity.saturating_add(assigned_before);
                    availability
                }),
            None => None,
        };

        Ok(capacity::validate(
            request.quantity,
            &bucket,
            availability.as_ref(),
        ))
    }

    /// Проверить и отправить
    pub async fn add_quantity(
        &self,
        pallet: &Pallet,
        request: AddQuantityRequest,
    ) -> Result<Pallet, InventoryError> {
        self.check(pallet, &request).await?.into_result()?;

        let pallet_id = pallet.to_string_id();
        let updated = self.backend.add_quantity(&pallet_id, &request).await?;
        log::info!(
            "[add-quantity] +{} '{}' on pallet {}",
            request.quantity,
            request.classification_type,
            updated.base.code
        );

        let payload = serde_json::to_value(&updated).unwrap_or(serde_json::Value::Null);
        self.graph.notify_updated(PALLETS_SOURCE, payload);
        self.graph.invalidate(PALLETS_SOURCE);
        Ok(updated)
    }

    async fn bucket(
        &self,
        request: &AddQuantityRequest,
        pallets: &[Pallet],
    ) -> Result<ClassificationBucket, InventoryError> {
        let order = self.backend.inbound_order(&request.order_id).await?;
        let limit = order
            .capacity_for(&request.classification_type)
            .ok_or_else(|| {
                InventoryError::validation(format!(
                    "Для заказа {} не задан лимит классификации \"{}\"",
                    order.base.code, request.classification_type
                ))
            })?;

        Ok(ClassificationBucket::from_pallets(
            &request.order_id,
            &request.classification_type,
            limit,
            pallets,
        ))
    }

    /// Ошибка загрузки не блокирует операцию: проверка заказа клиента пропускается
    async fn availability(
        &self,
        customer_order_id: &str,
        request: &AddQuantityRequest,
    ) -> Option<CustomerOrderAvailability> {
        let query = AvailabilityQuery {
            classification_type: request.classification_type.clone(),
            product_id: request.product_id.clone(),
        };
        match self.backend.availability(customer_order_id, &query).await {
            Ok(availability) => Some(availability),
            Err(InventoryError::NotFound { .. }) => {
                log::debug!(
                    "[add-quantity] customer order {} has no line for '{}'",
                    customer_order_id,
                    query.classification_type
                );
                None
            }
            Err(e) => {
                log::warn!(
                    "[add-quantity] availability for {} unavailable, skipping check: {}",
                    customer_order_id,
                    e
                );
                None
            }
        }
    }
}

#[async_trait(?Send)]
impl<B: AddQuantityBackend> EditValidator<Pallet> for AddQuantityFlow<B> {
    async fn check(&self, before: &Pallet, after: &Pallet) -> Result<(), InventoryError> {
        after.ensure_edit_allowed(before)?;
        let increases = after.quantity_increases(before);
        if increases.is_empty() {
            return Ok(());
        }

        let others: Vec<Pallet> = self
            .backend
            .pallets()
            .await?
            .into_iter()
            .filter(|p| p.base.id != before.base.id)
            .collect();
        let mut current = before.clone();
        current.customer_order_id = after.customer_order_id.clone();
        current.status = PalletStatus::Partial;

        // Сервер считает коробки паллеты только для того заказа клиента,
        // к которому она привязана сейчас
        let relinked = after.customer_order_id != before.customer_order_id;
        let mut assigned: HashMap<(String, String), i64> = HashMap::new();

        for request in increases {
            let key = (request.classification_type.clone(), request.product_id.clone());
            let assigned_before = *assigned.entry(key.clone()).or_insert_with(|| {
                if !relinked {
                    return 0;
                }
                before
                    .classifications
                    .iter()
                    .filter(|c| {
                        c.classification_type == request.classification_type
                            && c.product_id == request.product_id
                    })
                    .fold(0i64, |acc, c| acc.saturating_add(c.quantity))
            });

            let mut pallets = others.clone();
            pallets.push(current.clone());
            self.evaluate(
                after.customer_order_id.as_deref(),
                &request,
                &pallets,
                assigned_before,
            )
            .await?
            .into_result()?;

            current.add_quantity(&request)?;
            assigned.insert(key, assigned_before.saturating_add(request.quantity));
        }
        Ok(())
    }
}
