use super::repository;
use crate::shared::api_error::ApiResult;
use contracts::domain::a001_inbound_order::{
    InboundOrder, InboundOrderCreateDto, InboundOrderId, OrderState,
};
use contracts::domain::common::AggregateId;
use contracts::shared::errors::InventoryError;

/// Получение заказа; удалённый считается отсутствующим
pub async fn get(id: &str) -> ApiResult<InboundOrder> {
    let not_found = || InventoryError::not_found(format!("Входящий заказ {}", id));
    let order_id = InboundOrderId::from_string(id).map_err(|_| not_found())?;
    let order = repository::get_by_id(order_id.value())
        .await?
        .filter(|o| o.base.is_active())
        .ok_or_else(not_found)?;
    Ok(order)
}

pub async fn list_all() -> ApiResult<Vec<InboundOrder>> {
    Ok(repository::list_all().await?)
}

/// Создание заказа (всегда в `Pending`)
pub async fn create(dto: InboundOrderCreateDto) -> ApiResult<InboundOrder> {
    let aggregate = InboundOrder::new(dto);
    aggregate.validate().map_err(InventoryError::validation)?;
    repository::insert(&aggregate).await?;
    tracing::info!("Created inbound order {}", aggregate.base.code);
    Ok(aggregate)
}

/// Переход по таблице состояний; недопустимый - `InvalidState`
pub async fn transition(id: &str, to: OrderState) -> ApiResult<InboundOrder> {
    let mut order = get(id).await?;
    let from = order.state;
    order.apply_transition(to)?;
    order.base.metadata.bump();
    repository::update(&order).await?;
    tracing::info!("Inbound order {}: {} -> {}", order.base.code, from, to);
    Ok(order)
}
