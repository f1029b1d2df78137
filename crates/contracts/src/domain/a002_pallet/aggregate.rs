use super::lifecycle::{self, PalletOperation, PalletStatus};
use crate::domain::common::{
    aggregate_id::parse_uuid, AggregateId, AggregateRoot, BaseAggregate, EntityMetadata,
};
use crate::shared::errors::InventoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// ID типа для паллеты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PalletId(pub Uuid);

impl PalletId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for PalletId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }
    fn from_string(s: &str) -> Result<Self, String> {
        parse_uuid(s).map(PalletId::new)
    }
}

/// Строка классификации на паллете
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalletClassification {
    /// Входящий заказ (a001), из которого взяты коробки
    pub order_id: String,
    /// Тип классификации
    pub classification_type: String,
    /// Продукт каталога
    pub product_id: String,
    /// Количество коробок
    pub quantity: i64,
    /// Вес, кг
    pub weight: f64,
    /// Партия
    pub lot: String,
}

impl PalletClassification {
    pub fn matches(&self, order_id: &str, classification_type: &str, product_id: &str) -> bool {
        self.order_id == order_id
            && self.classification_type == classification_type
            && self.product_id == product_id
    }
}

/// Паллета упакованной продукции (агрегат a002)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pallet {
    #[serde(flatten)]
    pub base: BaseAggregate<PalletId>,

    pub status: PalletStatus,

    /// Заказ клиента (a003), под который собирается паллета
    pub customer_order_id: Option<String>,

    pub classifications: Vec<PalletClassification>,
}

/// DTO для создания паллеты
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletCreateDto {
    /// ID, выданный клиентом для оптимистично добавленной строки
    #[serde(default)]
    pub id: Option<String>,
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub customer_order_id: Option<String>,
}

/// Запрос на добавление коробок (относительное добавление)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddQuantityRequest {
    pub order_id: String,
    pub classification_type: String,
    pub product_id: String,
    pub quantity: i64,
    /// Вес добавляемых коробок, кг
    #[serde(default)]
    pub weight: f64,
    pub lot: Option<String>,
}

/// Запрос смены статуса
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: PalletStatus,
}

impl Pallet {
    /// Новая паллета открыта (`Partial`) и пуста
    pub fn new(dto: PalletCreateDto) -> Self {
        let id = dto
            .id
            .as_deref()
            .and_then(|s| PalletId::from_string(s).ok())
            .unwrap_or_else(|| PalletId::new(Uuid::new_v4()));
        Self {
            base: BaseAggregate::new(id, dto.code, dto.description),
            status: PalletStatus::Partial,
            customer_order_id: dto.customer_order_id,
            classifications: Vec::new(),
        }
    }

    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    pub fn total_boxes(&self) -> i64 {
        self.classifications
            .iter()
            .fold(0i64, |acc, c| acc.saturating_add(c.quantity))
    }

    pub fn total_weight(&self) -> f64 {
        self.classifications.iter().map(|c| c.weight).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.status == PalletStatus::Complete
    }

    pub fn ensure_can(&self, operation: PalletOperation) -> Result<(), InventoryError> {
        lifecycle::ensure_can_perform(&self.base.code, self.status, operation)
    }

    /// Добавить коробки к строке классификации (или создать строку)
    ///
    /// Вместимость здесь не проверяется: это задача валидатора, которому
    /// нужны данные других паллет и заказа клиента.
    pub fn add_quantity(&mut self, req: &AddQuantityRequest) -> Result<(), InventoryError> {
        self.ensure_can(PalletOperation::AddQuantity)?;
        if req.quantity <= 0 {
            return Err(InventoryError::validation(
                "Количество должно быть больше нуля",
            ));
        }

        match self
            .classifications
            .iter_mut()
            .find(|c| c.matches(&req.order_id, &req.classification_type, &req.product_id))
        {
            Some(line) => {
                line.quantity = line.quantity.checked_add(req.quantity).ok_or_else(|| {
                    InventoryError::validation(format!(
                        "Слишком большое количество коробок для типа \"{}\"",
                        req.classification_type
                    ))
                })?;
                line.weight += req.weight;
                if let Some(lot) = req.lot.as_ref().filter(|l| !l.trim().is_empty()) {
                    line.lot = lot.clone();
                }
            }
            None => self.classifications.push(PalletClassification {
                order_id: req.order_id.clone(),
                classification_type: req.classification_type.clone(),
                product_id: req.product_id.clone(),
                quantity: req.quantity,
                weight: req.weight,
                lot: req.lot.clone().unwrap_or_default(),
            }),
        }
        self.base.touch();
        Ok(())
    }

    /// Проверка правки полного снимка относительно сохранённой версии
    ///
    /// Полная паллета (до и после правки) допускает исправление веса и
    /// партии, но не новые коробки и не удаление строк.
    pub fn ensure_edit_allowed(&self, before: &Pallet) -> Result<(), InventoryError> {
        if !(before.is_complete() && self.is_complete()) {
            return Ok(());
        }
        if !self.quantity_increases(before).is_empty() {
            before.ensure_can(PalletOperation::AddQuantity)?;
        }
        let removed = before.classifications.iter().any(|c| {
            !self
                .classifications
                .iter()
                .any(|s| s.matches(&c.order_id, &c.classification_type, &c.product_id))
        });
        if removed {
            before.ensure_can(PalletOperation::RemoveClassification)?;
        }
        Ok(())
    }

    /// Прирост коробок по строкам относительно `before`, как запросы добавления
    ///
    /// Повторяющиеся строки снимка суммируются, уменьшения не учитываются.
    pub fn quantity_increases(&self, before: &Pallet) -> Vec<AddQuantityRequest> {
        let mut after: BTreeMap<(&str, &str, &str), i64> = BTreeMap::new();
        for line in &self.classifications {
            let key = (
                line.order_id.as_str(),
                line.classification_type.as_str(),
                line.product_id.as_str(),
            );
            let total = after.entry(key).or_insert(0);
            *total = total.saturating_add(line.quantity);
        }

        after
            .into_iter()
            .filter_map(|((order_id, classification_type, product_id), quantity)| {
                let was = before
                    .classifications
                    .iter()
                    .filter(|c| c.matches(order_id, classification_type, product_id))
                    .fold(0i64, |acc, c| acc.saturating_add(c.quantity));
                let delta = quantity.saturating_sub(was);
                (delta > 0).then(|| AddQuantityRequest {
                    order_id: order_id.to_string(),
                    classification_type: classification_type.to_string(),
                    product_id: product_id.to_string(),
                    quantity: delta,
                    weight: 0.0,
                    lot: None,
                })
            })
            .collect()
    }

    /// Сменить статус по таблице переходов
    pub fn set_status(&mut self, to: PalletStatus) -> Result<(), InventoryError> {
        let operation = match to {
            PalletStatus::Complete => PalletOperation::Complete,
            PalletStatus::Partial => PalletOperation::Reopen,
        };
        self.ensure_can(operation)?;
        self.status = to;
        self.base.touch();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.code.trim().is_empty() {
            return Err("Номер паллеты не может быть пустым".into());
        }
        for line in &self.classifications {
            if line.quantity < 0 {
                return Err(format!(
                    "Отрицательное количество коробок для типа \"{}\"",
                    line.classification_type
                ));
            }
            if line.weight < 0.0 {
                return Err(format!(
                    "Отрицательный вес для типа \"{}\"",
                    line.classification_type
                ));
            }
        }
        Ok(())
    }
}

impl AggregateRoot for Pallet {
    type Id = PalletId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a002"
    }

    fn collection_name() -> &'static str {
        "pallet"
    }

    fn element_name() -> &'static str {
        "Паллета"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pallet() -> Pallet {
        Pallet::new(PalletCreateDto {
            id: None,
            code: "P-001".into(),
            description: String::new(),
            customer_order_id: None,
        })
    }

    fn add(quantity: i64) -> AddQuantityRequest {
        AddQuantityRequest {
            order_id: "ord-1".into(),
            classification_type: "extra".into(),
            product_id: "mango".into(),
            quantity,
            weight: quantity as f64 * 4.5,
            lot: None,
        }
    }

    #[test]
    fn test_add_quantity_is_relative() {
        let mut p = pallet();
        p.add_quantity(&add(10)).unwrap();
        p.add_quantity(&add(5)).unwrap();
        assert_eq!(p.classifications.len(), 1);
        assert_eq!(p.total_boxes(), 15);
        assert!((p.total_weight() - 67.5).abs() < 1e-9);
    }

    #[test]
    fn test_add_quantity_rejected_on_complete_pallet() {
        let mut p = pallet();
        p.add_quantity(&add(10)).unwrap();
        p.set_status(PalletStatus::Complete).unwrap();
        let err = p.add_quantity(&add(1)).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidState { .. }));
        assert_eq!(p.total_boxes(), 10);
    }

    #[test]
    fn test_add_zero_is_validation_error() {
        let mut p = pallet();
        let err = p.add_quantity(&add(0)).unwrap_err();
        assert!(matches!(err, InventoryError::ValidationFailed { .. }));
    }

    #[test]
    fn test_add_quantity_overflow_keeps_line() {
        let mut p = pallet();
        p.add_quantity(&add(10)).unwrap();
        let mut huge = add(1);
        huge.quantity = i64::MAX;
        let err = p.add_quantity(&huge).unwrap_err();
        assert!(matches!(err, InventoryError::ValidationFailed { .. }));
        assert_eq!(p.total_boxes(), 10);
    }

    #[test]
    fn test_reopen_allows_additions_again() {
        let mut p = pallet();
        p.set_status(PalletStatus::Complete).unwrap();
        assert!(p.set_status(PalletStatus::Complete).is_err());
        p.set_status(PalletStatus::Partial).unwrap();
        assert!(p.add_quantity(&add(3)).is_ok());
    }

    #[test]
    fn test_quantity_increases_sum_duplicate_lines() {
        let mut before = pallet();
        before.add_quantity(&add(10)).unwrap();

        let mut after = before.clone();
        after.classifications[0].lot = "L7".into();
        assert!(after.quantity_increases(&before).is_empty());

        after.classifications.push(after.classifications[0].clone());
        let increases = after.quantity_increases(&before);
        assert_eq!(increases.len(), 1);
        assert_eq!(increases[0].quantity, 10);

        after.classifications.truncate(1);
        after.classifications[0].quantity = 4;
        assert!(after.quantity_increases(&before).is_empty());
    }

    #[test]
    fn test_complete_pallet_edit_gate() {
        let mut before = pallet();
        before.add_quantity(&add(10)).unwrap();
        before.set_status(PalletStatus::Complete).unwrap();

        let mut more = before.clone();
        more.classifications[0].quantity = 11;
        let err = more.ensure_edit_allowed(&before).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidState { .. }));

        let mut relabel = before.clone();
        relabel.classifications[0].lot = "L9".into();
        assert!(relabel.ensure_edit_allowed(&before).is_ok());

        let mut reopened = more.clone();
        reopened.status = PalletStatus::Partial;
        assert!(reopened.ensure_edit_allowed(&before).is_ok());
    }

    #[test]
    fn test_client_id_is_kept() {
        let id = "6f1c2d9a-3b1e-4c55-9d0e-2a7f8e4b1c33";
        let p = Pallet::new(PalletCreateDto {
            id: Some(id.into()),
            code: "P-002".into(),
            description: String::new(),
            customer_order_id: None,
        });
        assert_eq!(p.to_string_id(), id);
    }
}
