//! Жизненный цикл входящего заказа
//!
//! Таблица переходов фиксирована. `Cancelled` и `Classified` терминальные.
//! Проверка выполняется до сетевого вызова и повторяется на backend.

use serde::{Deserialize, Serialize};

use crate::shared::errors::InventoryError;

/// Состояние входящего заказа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Pending,
    Processing,
    Received,
    Classifying,
    Classified,
    Cancelled,
}

impl OrderState {
    /// Код для хранения в БД и в query-параметрах
    pub fn code(&self) -> &'static str {
        match self {
            OrderState::Pending => "pending",
            OrderState::Processing => "processing",
            OrderState::Received => "received",
            OrderState::Classifying => "classifying",
            OrderState::Classified => "classified",
            OrderState::Cancelled => "cancelled",
        }
    }

    /// Получить человекочитаемое название
    pub fn display_name(&self) -> &'static str {
        match self {
            OrderState::Pending => "Ожидает",
            OrderState::Processing => "В обработке",
            OrderState::Received => "Принят",
            OrderState::Classifying => "Классифицируется",
            OrderState::Classified => "Классифицирован",
            OrderState::Cancelled => "Отменён",
        }
    }

    /// Парсинг из строки
    pub fn from_code(code: &str) -> Option<Self> {
        OrderState::all()
            .iter()
            .copied()
            .find(|state| state.code() == code)
    }

    /// Получить все состояния
    pub fn all() -> &'static [OrderState] {
        &[
            OrderState::Pending,
            OrderState::Processing,
            OrderState::Received,
            OrderState::Classifying,
            OrderState::Classified,
            OrderState::Cancelled,
        ]
    }

    pub fn is_terminal(&self) -> bool {
        next_states(*self).is_empty()
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Допустимые следующие состояния
pub fn next_states(from: OrderState) -> &'static [OrderState] {
    match from {
        OrderState::Pending => &[OrderState::Processing, OrderState::Cancelled],
        OrderState::Processing => &[OrderState::Received, OrderState::Cancelled],
        OrderState::Received => &[OrderState::Classifying, OrderState::Cancelled],
        OrderState::Classifying => &[OrderState::Classified],
        OrderState::Classified => &[],
        OrderState::Cancelled => &[],
    }
}

pub fn can_transition(from: OrderState, to: OrderState) -> bool {
    next_states(from).contains(&to)
}

/// Проверка перехода с ошибкой `InvalidState` для UI и backend
pub fn ensure_transition(from: OrderState, to: OrderState) -> Result<(), InventoryError> {
    if can_transition(from, to) {
        return Ok(());
    }
    let message = if from == OrderState::Cancelled {
        "Отменённый заказ нельзя вернуть в работу".to_string()
    } else {
        format!(
            "Переход \"{}\" → \"{}\" не разрешён",
            from.display_name(),
            to.display_name()
        )
    };
    Err(InventoryError::invalid_state(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_states_are_subset_of_declared_table() {
        for &from in OrderState::all() {
            for &to in next_states(from) {
                assert!(OrderState::all().contains(&to));
                assert!(can_transition(from, to));
                assert_ne!(from, to, "self-loop for {}", from);
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        assert!(next_states(OrderState::Cancelled).is_empty());
        assert!(next_states(OrderState::Classified).is_empty());
        for &to in OrderState::all() {
            assert!(!can_transition(OrderState::Cancelled, to));
            assert!(!can_transition(OrderState::Classified, to));
        }
    }

    #[test]
    fn test_cancel_reachable_only_before_classification() {
        assert!(can_transition(OrderState::Pending, OrderState::Cancelled));
        assert!(can_transition(OrderState::Processing, OrderState::Cancelled));
        assert!(can_transition(OrderState::Received, OrderState::Cancelled));
        assert!(!can_transition(OrderState::Classifying, OrderState::Cancelled));
    }

    #[test]
    fn test_happy_path_walks_forward() {
        let path = [
            OrderState::Pending,
            OrderState::Processing,
            OrderState::Received,
            OrderState::Classifying,
            OrderState::Classified,
        ];
        for pair in path.windows(2) {
            assert!(ensure_transition(pair[0], pair[1]).is_ok());
        }
        assert!(!can_transition(OrderState::Received, OrderState::Pending));
    }

    #[test]
    fn test_reactivating_cancelled_order_is_invalid_state() {
        let err = ensure_transition(OrderState::Cancelled, OrderState::Pending).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidState { .. }));
        assert!(err.message().contains("Отменённый"));
    }

    #[test]
    fn test_codes_round_trip() {
        for &state in OrderState::all() {
            assert_eq!(OrderState::from_code(state.code()), Some(state));
        }
        assert_eq!(OrderState::from_code("unknown"), None);
    }
}
