use async_trait::async_trait;
use contracts::domain::a002_pallet::{
    AddQuantityRequest, Pallet, PalletCreateDto, PalletStatus, PalletSummary, StatusRequest,
};
use contracts::shared::errors::InventoryError;
use gloo_net::http::Request;

use crate::shared::api_utils::{api_url, read_empty, read_json, transport_error};
use crate::shared::edit_coordinator::{CommitEndpoint, Editable};

const API_BASE: &str = "/api/a002/pallets";

fn serialize_error(e: gloo_net::Error) -> InventoryError {
    InventoryError::validation(format!("Failed to serialize request: {}", e))
}

/// Получить полный список паллет
pub async fn fetch_pallets() -> Result<Vec<Pallet>, InventoryError> {
    let response = Request::get(&api_url(API_BASE))
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

/// Сводка по паллетам (считается на сервере по тем же данным)
pub async fn fetch_summary() -> Result<PalletSummary, InventoryError> {
    let response = Request::get(&api_url(&format!("{}/summary", API_BASE)))
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

pub async fn fetch_pallet(id: &str) -> Result<Pallet, InventoryError> {
    let response = Request::get(&api_url(&format!("{}/{}", API_BASE, id)))
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

pub async fn create_pallet(dto: &PalletCreateDto) -> Result<Pallet, InventoryError> {
    let response = Request::post(&api_url(API_BASE))
        .json(dto)
        .map_err(serialize_error)?
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

/// Записать полный снимок паллеты
pub async fn save_pallet(pallet: &Pallet) -> Result<Pallet, InventoryError> {
    let url = api_url(&format!("{}/{}", API_BASE, pallet.to_string_id()));
    let response = Request::put(&url)
        .json(pallet)
        .map_err(serialize_error)?
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

pub async fn delete_pallet(id: &str) -> Result<(), InventoryError> {
    let response = Request::delete(&api_url(&format!("{}/{}", API_BASE, id)))
        .send()
        .await
        .map_err(transport_error)?;
    read_empty(response).await
}

/// Добавить коробки (сервер повторно проверяет статус: 409 для полной паллеты)
pub async fn post_add_quantity(
    id: &str,
    request: &AddQuantityRequest,
) -> Result<Pallet, InventoryError> {
    let url = api_url(&format!("{}/{}/add-quantity", API_BASE, id));
    let response = Request::post(&url)
        .json(request)
        .map_err(serialize_error)?
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

pub async fn post_status(id: &str, status: PalletStatus) -> Result<Pallet, InventoryError> {
    let url = api_url(&format!("{}/{}/status", API_BASE, id));
    let response = Request::post(&url)
        .json(&StatusRequest { status })
        .map_err(serialize_error)?
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

impl Editable for Pallet {
    fn entity_key(&self) -> String {
        self.to_string_id()
    }

    fn check_edit(&self, before: &Self) -> Result<(), InventoryError> {
        self.ensure_edit_allowed(before)
    }
}

/// Запись строк таблицы паллет через REST
#[derive(Debug, Clone, Copy, Default)]
pub struct PalletEndpoint;

#[async_trait(?Send)]
impl CommitEndpoint<Pallet> for PalletEndpoint {
    async fn submit(&self, _key: &str, snapshot: &Pallet) -> Result<Option<Pallet>, InventoryError> {
        save_pallet(snapshot).await.map(Some)
    }

    async fn create(&self, entity: &Pallet) -> Result<Option<Pallet>, InventoryError> {
        let dto = PalletCreateDto {
            id: Some(entity.to_string_id()),
            code: entity.base.code.clone(),
            description: entity.base.description.clone(),
            customer_order_id: entity.customer_order_id.clone(),
        };
        create_pallet(&dto).await.map(Some)
    }

    async fn delete(&self, key: &str) -> Result<(), InventoryError> {
        delete_pallet(key).await
    }
}
