use super::repository;
use crate::domain::{a001_inbound_order, a003_customer_order};
use crate::shared::api_error::{ApiError, ApiResult};
use contracts::domain::a001_inbound_order::InboundOrder;
use contracts::domain::a002_pallet::{
    summarize, AddQuantityRequest, Pallet, PalletCreateDto, PalletId, PalletOperation,
    PalletStatus, PalletSummary,
};
use contracts::domain::a003_customer_order::{compute_availability, CustomerOrder};
use contracts::domain::common::AggregateId;
use contracts::shared::capacity::{self, ClassificationBucket};
use contracts::shared::errors::InventoryError;
use uuid::Uuid;

fn parse_id(id: &str) -> Result<Uuid, InventoryError> {
    PalletId::from_string(id)
        .map(|p| p.value())
        .map_err(|_| InventoryError::not_found(format!("Паллета {}", id)))
}

/// Получение паллеты; удалённая считается отсутствующей
pub async fn get(id: &str) -> ApiResult<Pallet> {
    let uuid = parse_id(id)?;
    let pallet = repository::get_by_id(uuid)
        .await?
        .filter(|p| p.base.is_active())
        .ok_or_else(|| InventoryError::not_found(format!("Паллета {}", id)))?;
    Ok(pallet)
}

pub async fn list_all() -> ApiResult<Vec<Pallet>> {
    Ok(repository::list_all().await?)
}

pub async fn summary() -> ApiResult<PalletSummary> {
    let pallets = repository::list_all().await?;
    Ok(summarize(&pallets))
}

/// Создание паллеты
///
/// Повтор запроса с тем же клиентским ID возвращает уже созданную паллету.
pub async fn create(dto: PalletCreateDto) -> ApiResult<Pallet> {
    let aggregate = Pallet::new(dto);
    if let Some(existing) = repository::get_by_id(aggregate.base.id.value()).await? {
        tracing::info!("Pallet {} already exists, create is a no-op", existing.base.code);
        return Ok(existing);
    }

    aggregate.validate().map_err(InventoryError::validation)?;
    repository::insert(&aggregate).await?;
    tracing::info!("Created pallet {}", aggregate.base.code);
    Ok(aggregate)
}

/// Запись полного снимка паллеты (идемпотентно)
///
/// Прирост коробок в снимке проходит ту же проверку вместимости, что и
/// `add_quantity`.
pub async fn update(id: &str, snapshot: Pallet) -> ApiResult<Pallet> {
    let existing = get(id).await?;
    let increases = snapshot.quantity_increases(&existing);

    let mut orders = Vec::new();
    let mut pallets = Vec::new();
    let mut customer_order = None;
    if !increases.is_empty() {
        for request in &increases {
            if orders
                .iter()
                .any(|o: &InboundOrder| o.to_string_id() == request.order_id)
            {
                continue;
            }
            match a001_inbound_order::service::get(&request.order_id).await {
                Ok(order) => orders.push(order),
                Err(ApiError::Domain(InventoryError::NotFound { .. })) => {}
                Err(e) => return Err(e),
            }
        }
        pallets = repository::list_all().await?;
        if let Some(customer_order_id) = &snapshot.customer_order_id {
            customer_order = a003_customer_order::service::find(customer_order_id).await?;
        }
    }

    let context = CapacityContext {
        orders: &orders,
        customer_order: customer_order.as_ref(),
        pallets: &pallets,
    };
    let merged = merge_snapshot(&existing, snapshot, &context)?;
    repository::update(&merged).await?;
    Ok(merged)
}

pub async fn delete(id: &str) -> ApiResult<()> {
    let existing = get(id).await?;
    existing.ensure_can(PalletOperation::Delete)?;
    if !repository::soft_delete(existing.base.id.value()).await? {
        return Err(InventoryError::not_found(format!("Паллета {}", id)).into());
    }
    tracing::info!("Deleted pallet {}", existing.base.code);
    Ok(())
}

/// Добавить коробки: статус → лимит классификации → остаток заказа клиента
pub async fn add_quantity(id: &str, request: AddQuantityRequest) -> ApiResult<Pallet> {
    let mut pallet = get(id).await?;
    pallet.ensure_can(PalletOperation::AddQuantity)?;

    let order = a001_inbound_order::service::get(&request.order_id).await?;
    let pallets = repository::list_all().await?;
    let customer_order = match &pallet.customer_order_id {
        Some(customer_order_id) => {
            a003_customer_order::service::find(customer_order_id).await?
        }
        None => None,
    };

    check_capacity(&order, customer_order.as_ref(), &pallets, &request)?;

    pallet.add_quantity(&request)?;
    pallet.base.metadata.bump();
    repository::update(&pallet).await?;
    tracing::info!(
        "Pallet {}: +{} boxes of '{}'",
        pallet.base.code,
        request.quantity,
        request.classification_type
    );
    Ok(pallet)
}

pub async fn set_status(id: &str, status: PalletStatus) -> ApiResult<Pallet> {
    let mut pallet = get(id).await?;
    pallet.set_status(status)?;
    pallet.base.metadata.bump();
    repository::update(&pallet).await?;
    tracing::info!("Pallet {} is now {}", pallet.base.code, status.code());
    Ok(pallet)
}

/// Повторная проверка вместимости на сервере по сохранённым данным
pub fn check_capacity(
    order: &InboundOrder,
    customer_order: Option<&CustomerOrder>,
    pallets: &[Pallet],
    request: &AddQuantityRequest,
) -> Result<(), InventoryError> {
    let limit = order
        .capacity_for(&request.classification_type)
        .ok_or_else(|| {
            InventoryError::validation(format!(
                "Для заказа {} не задан лимит классификации \"{}\"",
                order.base.code, request.classification_type
            ))
        })?;
    let bucket = ClassificationBucket::from_pallets(
        &order.to_string_id(),
        &request.classification_type,
        limit,
        pallets,
    );
    let availability = customer_order.and_then(|co| {
        compute_availability(co, &request.classification_type, &request.product_id, pallets)
    });

    capacity::validate(request.quantity, &bucket, availability.as_ref()).into_result()
}

/// Данные для проверки прироста коробок в снимке
pub struct CapacityContext<'a> {
    /// Входящие заказы, на которые ссылаются новые коробки
    pub orders: &'a [InboundOrder],
    /// Заказ клиента, к которому будет привязана паллета
    pub customer_order: Option<&'a CustomerOrder>,
    /// Все сохранённые паллеты
    pub pallets: &'a [Pallet],
}

/// Применить снимок от клиента к сохранённой паллете
///
/// Снимок заменяет редактируемые поля целиком. Служебные поля (ID, дата
/// создания, признак удаления) берутся из сохранённой версии. Если паллета
/// полная до и после правки, нельзя увеличить количество или убрать строку.
/// Каждый прирост коробок проверяется по лимиту классификации и остатку
/// заказа клиента.
pub fn merge_snapshot(
    existing: &Pallet,
    snapshot: Pallet,
    context: &CapacityContext<'_>,
) -> Result<Pallet, InventoryError> {
    if snapshot.base.id != existing.base.id {
        return Err(InventoryError::validation(
            "ID в теле запроса не совпадает с ID паллеты",
        ));
    }

    let mut merged = existing.clone();
    if snapshot.status != existing.status {
        merged.set_status(snapshot.status)?;
    }
    snapshot.ensure_edit_allowed(existing)?;
    check_snapshot_capacity(existing, &snapshot, context)?;

    merged.base.code = snapshot.base.code;
    merged.base.description = snapshot.base.description;
    merged.base.comment = snapshot.base.comment;
    merged.customer_order_id = snapshot.customer_order_id;
    merged.classifications = snapshot.classifications;
    merged.validate().map_err(InventoryError::validation)?;
    merged.base.metadata.bump();
    Ok(merged)
}

/// Прирост по строкам проверяется по очереди: уже проверенный прирост
/// учитывается как разложенный при проверке следующего
fn check_snapshot_capacity(
    existing: &Pallet,
    snapshot: &Pallet,
    context: &CapacityContext<'_>,
) -> Result<(), InventoryError> {
    let others: Vec<Pallet> = context
        .pallets
        .iter()
        .filter(|p| p.base.id != existing.base.id)
        .cloned()
        .collect();
    let mut current = existing.clone();
    current.customer_order_id = snapshot.customer_order_id.clone();
    current.status = PalletStatus::Partial;

    for request in snapshot.quantity_increases(existing) {
        let order = context
            .orders
            .iter()
            .find(|o| o.to_string_id() == request.order_id)
            .ok_or_else(|| {
                InventoryError::validation(format!(
                    "Входящий заказ {} не найден",
                    request.order_id
                ))
            })?;
        let mut pallets = others.clone();
        pallets.push(current.clone());
        check_capacity(order, context.customer_order, &pallets, &request)?;
        current.add_quantity(&request)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::a001_inbound_order::{ClassificationLimit, InboundOrderCreateDto};
    use contracts::domain::a002_pallet::PalletClassification;
    use contracts::domain::a003_customer_order::{CustomerOrderCreateDto, CustomerOrderLine};

    fn inbound_order() -> InboundOrder {
        InboundOrder::new(InboundOrderCreateDto {
            code: "IN-7".into(),
            description: String::new(),
            supplier: "Finca Sol".into(),
            received_weight_kg: 900.0,
            classification_limits: vec![ClassificationLimit {
                classification_type: "extra".into(),
                capacity: 100,
            }],
        })
    }

    fn line(order_id: &str, quantity: i64) -> PalletClassification {
        PalletClassification {
            order_id: order_id.into(),
            classification_type: "extra".into(),
            product_id: "mango".into(),
            quantity,
            weight: 0.0,
            lot: "L1".into(),
        }
    }

    fn pallet(code: &str, customer_order_id: Option<String>, lines: Vec<PalletClassification>) -> Pallet {
        let mut p = Pallet::new(PalletCreateDto {
            id: None,
            code: code.into(),
            description: String::new(),
            customer_order_id,
        });
        p.classifications = lines;
        p
    }

    const NO_INCREASES: CapacityContext<'static> = CapacityContext {
        orders: &[],
        customer_order: None,
        pallets: &[],
    };

    fn request(order_id: &str, quantity: i64) -> AddQuantityRequest {
        AddQuantityRequest {
            order_id: order_id.into(),
            classification_type: "extra".into(),
            product_id: "mango".into(),
            quantity,
            weight: 0.0,
            lot: None,
        }
    }

    #[test]
    fn test_check_capacity_uses_all_pallets() {
        let order = inbound_order();
        let order_id = order.to_string_id();
        let pallets = vec![
            pallet("P-001", None, vec![line(&order_id, 50)]),
            pallet("P-002", None, vec![line(&order_id, 30)]),
        ];

        assert!(check_capacity(&order, None, &pallets, &request(&order_id, 20)).is_ok());
        let err = check_capacity(&order, None, &pallets, &request(&order_id, 21)).unwrap_err();
        assert!(matches!(err, InventoryError::ValidationFailed { .. }));
    }

    #[test]
    fn test_check_capacity_respects_customer_order() {
        let order = inbound_order();
        let order_id = order.to_string_id();
        let customer_order = CustomerOrder::new(CustomerOrderCreateDto {
            code: "CO-42".into(),
            description: String::new(),
            customer: "Frutas del Norte".into(),
            lines: vec![CustomerOrderLine {
                classification_type: "extra".into(),
                product_id: "mango".into(),
                required_quantity: 40,
            }],
        });
        let pallets = vec![pallet(
            "P-001",
            Some(customer_order.to_string_id()),
            vec![line(&order_id, 25)],
        )];

        assert!(check_capacity(&order, Some(&customer_order), &pallets, &request(&order_id, 15)).is_ok());
        let err = check_capacity(&order, Some(&customer_order), &pallets, &request(&order_id, 16))
            .unwrap_err();
        assert!(err.message().starts_with("Заказу клиента нужно ещё 15"));
    }

    #[test]
    fn test_merge_snapshot_is_idempotent() {
        let existing = pallet("P-001", None, vec![line("ord-1", 10)]);
        let mut snapshot = existing.clone();
        snapshot.classifications[0].lot = "L2".into();

        let once = merge_snapshot(&existing, snapshot.clone(), &NO_INCREASES).unwrap();
        let twice = merge_snapshot(&once, snapshot, &NO_INCREASES).unwrap();

        assert_eq!(once.classifications, twice.classifications);
        assert_eq!(twice.classifications[0].lot, "L2");
        assert_eq!(twice.base.metadata.created_at, existing.base.metadata.created_at);
    }

    #[test]
    fn test_merge_snapshot_keeps_deleted_flag_and_id() {
        let existing = pallet("P-001", None, vec![]);
        let mut snapshot = existing.clone();
        snapshot.base.metadata.is_deleted = true;
        snapshot.base.description = "у ворот 3".into();

        let merged = merge_snapshot(&existing, snapshot, &NO_INCREASES).unwrap();
        assert!(!merged.base.metadata.is_deleted);
        assert_eq!(merged.base.description, "у ворот 3");

        let other = pallet("P-002", None, vec![]);
        assert!(merge_snapshot(&existing, other, &NO_INCREASES).is_err());
    }

    #[test]
    fn test_complete_pallet_snapshot_cannot_add_boxes() {
        let mut existing = pallet("P-001", None, vec![line("ord-1", 10)]);
        existing.set_status(PalletStatus::Complete).unwrap();

        let mut more = existing.clone();
        more.classifications[0].quantity = 11;
        let err = merge_snapshot(&existing, more, &NO_INCREASES).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidState { .. }));

        let mut relabel = existing.clone();
        relabel.classifications[0].lot = "L9".into();
        assert!(merge_snapshot(&existing, relabel, &NO_INCREASES).is_ok());

        let mut emptied = existing.clone();
        emptied.classifications.clear();
        assert!(merge_snapshot(&existing, emptied, &NO_INCREASES).is_err());
    }

    #[test]
    fn test_snapshot_status_change_follows_transitions() {
        let existing = pallet("P-001", None, vec![line("ord-1", 10)]);
        let mut closing = existing.clone();
        closing.status = PalletStatus::Complete;

        let merged = merge_snapshot(&existing, closing, &NO_INCREASES).unwrap();
        assert!(merged.is_complete());
    }

    #[test]
    fn test_snapshot_increase_is_checked_against_limit() {
        let order = inbound_order();
        let order_id = order.to_string_id();
        let existing = pallet("P-001", None, vec![line(&order_id, 80)]);
        let pallets = vec![existing.clone()];
        let orders = vec![order];
        let context = CapacityContext {
            orders: &orders,
            customer_order: None,
            pallets: &pallets,
        };

        let mut huge = existing.clone();
        huge.classifications[0].quantity = 1_000_000;
        let err = merge_snapshot(&existing, huge, &context).unwrap_err();
        assert!(matches!(err, InventoryError::ValidationFailed { .. }));
        assert!(err.message().contains("не более 20"));

        let mut fits = existing.clone();
        fits.classifications[0].quantity = 100;
        let merged = merge_snapshot(&existing, fits, &context).unwrap();
        assert_eq!(merged.total_boxes(), 100);
    }

    #[test]
    fn test_snapshot_increases_accumulate_across_lines() {
        let order = inbound_order();
        let order_id = order.to_string_id();
        let existing = pallet("P-001", None, vec![line(&order_id, 50)]);
        let sibling = pallet("P-002", None, vec![line(&order_id, 30)]);
        let pallets = vec![existing.clone(), sibling];
        let orders = vec![order];
        let context = CapacityContext {
            orders: &orders,
            customer_order: None,
            pallets: &pallets,
        };

        // Две новые строки по 15 коробок: каждая влезает, вместе нет
        let mut snapshot = existing.clone();
        let mut kiwi = line(&order_id, 15);
        kiwi.product_id = "kiwi".into();
        let mut papaya = line(&order_id, 15);
        papaya.product_id = "papaya".into();
        snapshot.classifications.push(kiwi);
        snapshot.classifications.push(papaya);

        let err = merge_snapshot(&existing, snapshot, &context).unwrap_err();
        assert!(matches!(err, InventoryError::ValidationFailed { .. }));
    }

    #[test]
    fn test_snapshot_increase_respects_customer_order() {
        let order = inbound_order();
        let order_id = order.to_string_id();
        let customer_order = CustomerOrder::new(CustomerOrderCreateDto {
            code: "CO-42".into(),
            description: String::new(),
            customer: "Frutas del Norte".into(),
            lines: vec![CustomerOrderLine {
                classification_type: "extra".into(),
                product_id: "mango".into(),
                required_quantity: 40,
            }],
        });
        let existing = pallet(
            "P-001",
            Some(customer_order.to_string_id()),
            vec![line(&order_id, 25)],
        );
        let pallets = vec![existing.clone()];
        let orders = vec![order];
        let context = CapacityContext {
            orders: &orders,
            customer_order: Some(&customer_order),
            pallets: &pallets,
        };

        let mut snapshot = existing.clone();
        snapshot.classifications[0].quantity = 41;
        let err = merge_snapshot(&existing, snapshot, &context).unwrap_err();
        assert!(err.message().starts_with("Заказу клиента нужно ещё 15"));

        let mut snapshot = existing.clone();
        snapshot.classifications[0].quantity = 40;
        assert!(merge_snapshot(&existing, snapshot, &context).is_ok());
    }

    #[test]
    fn test_snapshot_increase_for_unknown_order_is_rejected() {
        let existing = pallet("P-001", None, vec![line("ord-gone", 5)]);
        let mut snapshot = existing.clone();
        snapshot.classifications[0].quantity = 6;

        let err = merge_snapshot(&existing, snapshot, &NO_INCREASES).unwrap_err();
        assert!(matches!(err, InventoryError::ValidationFailed { .. }));
    }
}
