use contracts::domain::a001_inbound_order::lifecycle::ensure_transition;
use contracts::domain::a001_inbound_order::{
    InboundOrder, InboundOrderCreateDto, OrderState, TransitionRequest,
};
use contracts::shared::errors::InventoryError;
use gloo_net::http::Request;

use crate::shared::api_utils::{api_url, read_json, transport_error};

const API_BASE: &str = "/api/a001/inbound-orders";

fn serialize_error(e: gloo_net::Error) -> InventoryError {
    InventoryError::validation(format!("Failed to serialize request: {}", e))
}

pub async fn fetch_inbound_orders() -> Result<Vec<InboundOrder>, InventoryError> {
    let response = Request::get(&api_url(API_BASE))
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

pub async fn fetch_inbound_order(id: &str) -> Result<InboundOrder, InventoryError> {
    let response = Request::get(&api_url(&format!("{}/{}", API_BASE, id)))
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

pub async fn create_inbound_order(
    dto: &InboundOrderCreateDto,
) -> Result<InboundOrder, InventoryError> {
    let response = Request::post(&api_url(API_BASE))
        .json(dto)
        .map_err(serialize_error)?
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

/// Перевести заказ в новое состояние
///
/// Недопустимый переход отклоняется до сетевого вызова.
pub async fn transition(order: &InboundOrder, to: OrderState) -> Result<InboundOrder, InventoryError> {
    ensure_transition(order.state, to)?;

    let url = api_url(&format!("{}/{}/transition", API_BASE, order.to_string_id()));
    let response = Request::post(&url)
        .json(&TransitionRequest { to })
        .map_err(serialize_error)?
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}
