//! Жизненный цикл паллеты: Partial ↔ Complete
//!
//! Добавление коробок относительное (add, не set) и запрещено для полной
//! паллеты. Проверка выполняется на клиенте до сетевого вызова и
//! повторяется на сервере.

use serde::{Deserialize, Serialize};

use crate::shared::errors::InventoryError;

/// Статус паллеты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PalletStatus {
    Partial,
    Complete,
}

/// Операции над паллетой, которые зависят от статуса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PalletOperation {
    /// Добавить коробки к строке классификации
    AddQuantity,
    /// Исправить вес/партию существующей строки
    EditClassification,
    /// Удалить строку классификации
    RemoveClassification,
    /// Закрыть паллету
    Complete,
    /// Снова открыть паллету
    Reopen,
    Delete,
}

impl PalletStatus {
    pub fn code(&self) -> &'static str {
        match self {
            PalletStatus::Partial => "partial",
            PalletStatus::Complete => "complete",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PalletStatus::Partial => "Неполная",
            PalletStatus::Complete => "Полная",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "partial" => Some(PalletStatus::Partial),
            "complete" => Some(PalletStatus::Complete),
            _ => None,
        }
    }
}

impl std::fmt::Display for PalletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

pub fn next_statuses(from: PalletStatus) -> &'static [PalletStatus] {
    match from {
        PalletStatus::Partial => &[PalletStatus::Complete],
        PalletStatus::Complete => &[PalletStatus::Partial],
    }
}

pub fn can_transition(from: PalletStatus, to: PalletStatus) -> bool {
    next_statuses(from).contains(&to)
}

pub fn can_perform(status: PalletStatus, operation: PalletOperation) -> bool {
    match (status, operation) {
        (PalletStatus::Partial, PalletOperation::Reopen) => false,
        (PalletStatus::Partial, _) => true,
        (PalletStatus::Complete, PalletOperation::AddQuantity)
        | (PalletStatus::Complete, PalletOperation::RemoveClassification)
        | (PalletStatus::Complete, PalletOperation::Complete) => false,
        (PalletStatus::Complete, PalletOperation::EditClassification)
        | (PalletStatus::Complete, PalletOperation::Reopen)
        | (PalletStatus::Complete, PalletOperation::Delete) => true,
    }
}

/// Проверка операции с ошибкой `InvalidState`
pub fn ensure_can_perform(
    pallet_code: &str,
    status: PalletStatus,
    operation: PalletOperation,
) -> Result<(), InventoryError> {
    if can_perform(status, operation) {
        return Ok(());
    }
    let message = match operation {
        PalletOperation::AddQuantity => {
            format!("Паллета {} полная, добавление коробок запрещено", pallet_code)
        }
        _ => format!(
            "Операция {:?} недоступна для паллеты {} в статусе \"{}\"",
            operation,
            pallet_code,
            status.display_name()
        ),
    };
    Err(InventoryError::invalid_state(message))
}
