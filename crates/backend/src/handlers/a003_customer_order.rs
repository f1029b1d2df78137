use axum::{
    extract::{Path, Query},
    Json,
};
use contracts::domain::a003_customer_order::{
    AvailabilityQuery, CustomerOrder, CustomerOrderAvailability, CustomerOrderCreateDto,
};

use crate::domain::a003_customer_order;
use crate::shared::api_error::ApiResult;

/// GET /api/a003/customer-orders
pub async fn list_all() -> ApiResult<Json<Vec<CustomerOrder>>> {
    Ok(Json(a003_customer_order::service::list_all().await?))
}

/// GET /api/a003/customer-orders/:id
pub async fn get_by_id(Path(id): Path<String>) -> ApiResult<Json<CustomerOrder>> {
    Ok(Json(a003_customer_order::service::get(&id).await?))
}

/// POST /api/a003/customer-orders
pub async fn create(Json(dto): Json<CustomerOrderCreateDto>) -> ApiResult<Json<CustomerOrder>> {
    Ok(Json(a003_customer_order::service::create(dto).await?))
}

/// GET /api/a003/customer-orders/:id/availability?classification_type=&product_id=
pub async fn availability(
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<CustomerOrderAvailability>> {
    Ok(Json(
        a003_customer_order::service::availability(&id, &query).await?,
    ))
}
