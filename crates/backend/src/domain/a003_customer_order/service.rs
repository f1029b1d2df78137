use super::repository;
use crate::domain::a002_pallet;
use crate::shared::api_error::ApiResult;
use contracts::domain::a003_customer_order::{
    compute_availability, AvailabilityQuery, CustomerOrder, CustomerOrderAvailability,
    CustomerOrderCreateDto, CustomerOrderId,
};
use contracts::domain::common::AggregateId;
use contracts::shared::errors::InventoryError;

/// Поиск заказа клиента; `None`, если ID некорректен, заказа нет или он удалён
pub async fn find(id: &str) -> ApiResult<Option<CustomerOrder>> {
    let Ok(order_id) = CustomerOrderId::from_string(id) else {
        return Ok(None);
    };
    let order = repository::get_by_id(order_id.value()).await?;
    Ok(order.filter(|o| o.base.is_active()))
}

pub async fn get(id: &str) -> ApiResult<CustomerOrder> {
    find(id)
        .await?
        .ok_or_else(|| InventoryError::not_found(format!("Заказ клиента {}", id)).into())
}

pub async fn list_all() -> ApiResult<Vec<CustomerOrder>> {
    Ok(repository::list_all().await?)
}

pub async fn create(dto: CustomerOrderCreateDto) -> ApiResult<CustomerOrder> {
    let aggregate = CustomerOrder::new(dto);
    aggregate.validate().map_err(InventoryError::validation)?;
    repository::insert(&aggregate).await?;
    tracing::info!("Created customer order {}", aggregate.base.code);
    Ok(aggregate)
}

/// Сколько коробок типа/продукта заказу ещё нужно
///
/// Считается по текущим паллетам при каждом запросе.
pub async fn availability(
    id: &str,
    query: &AvailabilityQuery,
) -> ApiResult<CustomerOrderAvailability> {
    let order = get(id).await?;
    let pallets = a002_pallet::repository::list_all().await?;
    let availability = compute_availability(
        &order,
        &query.classification_type,
        &query.product_id,
        &pallets,
    )
    .ok_or_else(|| {
        InventoryError::not_found(format!(
            "В заказе {} нет строки \"{}\" / {}",
            order.base.code, query.classification_type, query.product_id
        ))
    })?;
    Ok(availability)
}
