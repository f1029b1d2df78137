use contracts::domain::a003_customer_order::{
    AvailabilityQuery, CustomerOrder, CustomerOrderAvailability, CustomerOrderCreateDto,
};
use contracts::shared::errors::InventoryError;
use gloo_net::http::Request;

use crate::shared::api_utils::{api_url, read_json, transport_error};

const API_BASE: &str = "/api/a003/customer-orders";

pub async fn fetch_customer_orders() -> Result<Vec<CustomerOrder>, InventoryError> {
    let response = Request::get(&api_url(API_BASE))
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

pub async fn create_customer_order(
    dto: &CustomerOrderCreateDto,
) -> Result<CustomerOrder, InventoryError> {
    let response = Request::post(&api_url(API_BASE))
        .json(dto)
        .map_err(|e| InventoryError::validation(format!("Failed to serialize request: {}", e)))?
        .send()
        .await
        .map_err(transport_error)?;
    read_json(response).await
}

/// Путь запроса доступности по строке заказа клиента
pub fn availability_path(customer_order_id: &str, query: &AvailabilityQuery) -> String {
    format!(
        "{}/{}/availability?classification_type={}&product_id={}",
        API_BASE,
        urlencoding::encode(customer_order_id),
        urlencoding::encode(&query.classification_type),
        urlencoding::encode(&query.product_id)
    )
}

/// Доступность читается всегда свежей, без кэша
pub async fn fetch_availability(
    customer_order_id: &str,
    query: &AvailabilityQuery,
) -> Result<CustomerOrderAvailability, InventoryError> {
    let url = api_url(&availability_path(customer_order_id, query));
    let response = Request::get(&url).send().await.map_err(transport_error)?;
    read_json(response).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_path_encodes_query() {
        let query = AvailabilityQuery {
            classification_type: "extra plus".into(),
            product_id: "mango&kent".into(),
        };
        assert_eq!(
            availability_path("CO-42", &query),
            "/api/a003/customer-orders/CO-42/availability?classification_type=extra%20plus&product_id=mango%26kent"
        );
    }
}
