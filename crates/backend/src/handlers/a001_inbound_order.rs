use axum::{extract::Path, Json};
use contracts::domain::a001_inbound_order::{
    InboundOrder, InboundOrderCreateDto, TransitionRequest,
};

use crate::domain::a001_inbound_order;
use crate::shared::api_error::ApiResult;

/// GET /api/a001/inbound-orders
pub async fn list_all() -> ApiResult<Json<Vec<InboundOrder>>> {
    Ok(Json(a001_inbound_order::service::list_all().await?))
}

/// GET /api/a001/inbound-orders/:id
pub async fn get_by_id(Path(id): Path<String>) -> ApiResult<Json<InboundOrder>> {
    Ok(Json(a001_inbound_order::service::get(&id).await?))
}

/// POST /api/a001/inbound-orders
pub async fn create(Json(dto): Json<InboundOrderCreateDto>) -> ApiResult<Json<InboundOrder>> {
    Ok(Json(a001_inbound_order::service::create(dto).await?))
}

/// POST /api/a001/inbound-orders/:id/transition
pub async fn transition(
    Path(id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<Json<InboundOrder>> {
    Ok(Json(
        a001_inbound_order::service::transition(&id, request.to).await?,
    ))
}
