use axum::{extract::Path, http::StatusCode, Json};
use contracts::domain::a002_pallet::{
    AddQuantityRequest, Pallet, PalletCreateDto, PalletSummary, StatusRequest,
};

use crate::domain::a002_pallet;
use crate::shared::api_error::ApiResult;

/// GET /api/a002/pallets
pub async fn list_all() -> ApiResult<Json<Vec<Pallet>>> {
    Ok(Json(a002_pallet::service::list_all().await?))
}

/// GET /api/a002/pallets/summary
pub async fn summary() -> ApiResult<Json<PalletSummary>> {
    Ok(Json(a002_pallet::service::summary().await?))
}

/// GET /api/a002/pallets/:id
pub async fn get_by_id(Path(id): Path<String>) -> ApiResult<Json<Pallet>> {
    Ok(Json(a002_pallet::service::get(&id).await?))
}

/// POST /api/a002/pallets
pub async fn create(Json(dto): Json<PalletCreateDto>) -> ApiResult<Json<Pallet>> {
    Ok(Json(a002_pallet::service::create(dto).await?))
}

/// PUT /api/a002/pallets/:id
///
/// Тело запроса: полный снимок паллеты.
pub async fn update(
    Path(id): Path<String>,
    Json(snapshot): Json<Pallet>,
) -> ApiResult<Json<Pallet>> {
    Ok(Json(a002_pallet::service::update(&id, snapshot).await?))
}

/// DELETE /api/a002/pallets/:id
pub async fn delete(Path(id): Path<String>) -> ApiResult<StatusCode> {
    a002_pallet::service::delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/a002/pallets/:id/add-quantity
pub async fn add_quantity(
    Path(id): Path<String>,
    Json(request): Json<AddQuantityRequest>,
) -> ApiResult<Json<Pallet>> {
    Ok(Json(a002_pallet::service::add_quantity(&id, request).await?))
}

/// POST /api/a002/pallets/:id/status
pub async fn set_status(
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<Pallet>> {
    Ok(Json(
        a002_pallet::service::set_status(&id, request.status).await?,
    ))
}
