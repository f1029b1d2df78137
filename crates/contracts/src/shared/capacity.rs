//! Двухступенчатая проверка вместимости перед добавлением коробок
//!
//! 1. Корзина классификации `(заказ, тип)` не должна выйти за объявленный лимит.
//! 2. Если паллета привязана к заказу клиента - нельзя положить больше,
//!    чем заказу ещё нужно.
//!
//! Проверки выполняются строго в этом порядке, первая ошибка возвращается.
//! Границы включительные: ровно остаток - допустимо.

use serde::{Deserialize, Serialize};

use crate::domain::a002_pallet::{Pallet, PalletClassification};
use crate::domain::a003_customer_order::CustomerOrderAvailability;
use crate::shared::errors::InventoryError;

/// Сколько коробок уже разложено в корзину `(заказ, тип)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationBucket {
    pub order_id: String,
    pub classification_type: String,
    /// Объявленный лимит корзины
    pub capacity: i64,
    /// Уже разложено по всем паллетам
    pub committed: i64,
}

impl ClassificationBucket {
    pub fn new(
        order_id: impl Into<String>,
        classification_type: impl Into<String>,
        capacity: i64,
        committed: i64,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            classification_type: classification_type.into(),
            capacity,
            committed,
        }
    }

    /// Собрать корзину из строк классификации (соседние записи любых паллет)
    pub fn from_entries<'a>(
        order_id: &str,
        classification_type: &str,
        capacity: i64,
        entries: impl IntoIterator<Item = &'a PalletClassification>,
    ) -> Self {
        let committed = entries
            .into_iter()
            .filter(|c| c.order_id == order_id && c.classification_type == classification_type)
            .fold(0i64, |acc, c| acc.saturating_add(c.quantity));
        Self::new(order_id, classification_type, capacity, committed)
    }

    /// Собрать корзину по снимку паллет (удалённые не учитываются)
    pub fn from_pallets(
        order_id: &str,
        classification_type: &str,
        capacity: i64,
        pallets: &[Pallet],
    ) -> Self {
        Self::from_entries(
            order_id,
            classification_type,
            capacity,
            pallets
                .iter()
                .filter(|p| p.base.is_active())
                .flat_map(|p| p.classifications.iter()),
        )
    }

    pub fn remaining(&self) -> i64 {
        self.capacity.saturating_sub(self.committed).max(0)
    }
}

/// Результат проверки для диалога добавления
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }

    pub fn into_result(self) -> Result<(), InventoryError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(InventoryError::validation(self.message.unwrap_or_default()))
        }
    }
}

/// Комбинированная проверка. `availability = None` - проверка заказа клиента
/// пропускается (паллета не привязана или данные недоступны).
pub fn validate(
    quantity_to_add: i64,
    bucket: &ClassificationBucket,
    availability: Option<&CustomerOrderAvailability>,
) -> ValidationResult {
    let checks = check_quantity(quantity_to_add)
        .and_then(|_| check_classification(quantity_to_add, bucket))
        .and_then(|_| match availability {
            Some(a) => check_availability(quantity_to_add, a),
            None => Ok(()),
        });

    match checks {
        Ok(()) => ValidationResult::valid(),
        Err(message) => ValidationResult::invalid(message),
    }
}

fn check_quantity(quantity: i64) -> Result<(), String> {
    if quantity <= 0 {
        return Err("Количество коробок должно быть больше нуля".to_string());
    }
    Ok(())
}

fn check_classification(quantity: i64, bucket: &ClassificationBucket) -> Result<(), String> {
    let fits = bucket
        .committed
        .checked_add(quantity)
        .is_some_and(|total| total <= bucket.capacity);
    if fits {
        return Ok(());
    }
    Err(format!(
        "Превышен лимит классификации \"{}\": лимит {} коробок, уже разложено {}, можно добавить не более {}",
        bucket.classification_type,
        bucket.capacity,
        bucket.committed,
        bucket.remaining()
    ))
}

fn check_availability(quantity: i64, availability: &CustomerOrderAvailability) -> Result<(), String> {
    let remaining = availability.remaining();
    if quantity <= remaining {
        return Ok(());
    }
    Err(format!(
        "Заказу клиента нужно ещё {} коробок типа \"{}\", нельзя добавить {}",
        remaining, availability.classification_type, quantity
    ))
}
