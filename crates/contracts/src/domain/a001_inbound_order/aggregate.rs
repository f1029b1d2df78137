use super::lifecycle::{self, OrderState};
use crate::domain::common::{
    aggregate_id::parse_uuid, AggregateId, AggregateRoot, BaseAggregate, EntityMetadata,
};
use crate::shared::errors::InventoryError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ID типа для входящего заказа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InboundOrderId(pub Uuid);

impl InboundOrderId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for InboundOrderId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }
    fn from_string(s: &str) -> Result<Self, String> {
        parse_uuid(s).map(InboundOrderId::new)
    }
}

/// Объявленная вместимость одной корзины классификации (в коробках)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationLimit {
    /// Тип классификации (калибр/сорт), например "extra"
    pub classification_type: String,
    /// Сколько коробок этого типа можно разложить по паллетам
    pub capacity: i64,
}

/// Входящий заказ: приёмка, взвешивание и классификация (агрегат a001)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundOrder {
    #[serde(flatten)]
    pub base: BaseAggregate<InboundOrderId>,

    /// Поставщик
    pub supplier: String,

    /// Вес при приёмке, кг
    pub received_weight_kg: f64,

    /// Состояние жизненного цикла
    pub state: OrderState,

    /// Лимиты корзин классификации
    pub classification_limits: Vec<ClassificationLimit>,
}

/// DTO для создания заказа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundOrderCreateDto {
    pub code: String,
    pub description: String,
    pub supplier: String,
    pub received_weight_kg: f64,
    #[serde(default)]
    pub classification_limits: Vec<ClassificationLimit>,
}

/// Запрос перехода состояния
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub to: OrderState,
}

impl InboundOrder {
    /// Новый заказ всегда создаётся в `Pending`
    pub fn new(dto: InboundOrderCreateDto) -> Self {
        Self {
            base: BaseAggregate::new(
                InboundOrderId::new(Uuid::new_v4()),
                dto.code,
                dto.description,
            ),
            supplier: dto.supplier,
            received_weight_kg: dto.received_weight_kg,
            state: OrderState::Pending,
            classification_limits: dto.classification_limits,
        }
    }

    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    /// Вместимость корзины для типа классификации
    pub fn capacity_for(&self, classification_type: &str) -> Option<i64> {
        self.classification_limits
            .iter()
            .find(|l| l.classification_type == classification_type)
            .map(|l| l.capacity)
    }

    /// Заменить состояние после проверки по таблице переходов
    pub fn apply_transition(&mut self, to: OrderState) -> Result<(), InventoryError> {
        lifecycle::ensure_transition(self.state, to)?;
        self.state = to;
        self.base.touch();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.code.trim().is_empty() {
            return Err("Код заказа не может быть пустым".into());
        }
        if self.received_weight_kg < 0.0 {
            return Err("Вес не может быть отрицательным".into());
        }
        if let Some(limit) = self.classification_limits.iter().find(|l| l.capacity < 0) {
            return Err(format!(
                "Отрицательная вместимость для типа \"{}\"",
                limit.classification_type
            ));
        }
        Ok(())
    }
}

impl AggregateRoot for InboundOrder {
    type Id = InboundOrderId;

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
        "a001"
    }

    fn collection_name() -> &'static str {
        "inbound_order"
    }

    fn element_name() -> &'static str {
        "Входящий заказ"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> InboundOrder {
        InboundOrder::new(InboundOrderCreateDto {
            code: "ORD-7".into(),
            description: "Манго, партия 7".into(),
            supplier: "Finca Norte".into(),
            received_weight_kg: 1250.0,
            classification_limits: vec![ClassificationLimit {
                classification_type: "extra".into(),
                capacity: 100,
            }],
        })
    }

    #[test]
    fn test_new_order_starts_pending() {
        let o = order();
        assert_eq!(o.state, OrderState::Pending);
        assert_eq!(InboundOrder::full_name(), "a001_inbound_order");
        assert!(o.validate().is_ok());
    }

    #[test]
    fn test_apply_transition_keeps_state_on_rejection() {
        let mut o = order();
        o.apply_transition(OrderState::Cancelled).unwrap();
        let err = o.apply_transition(OrderState::Processing).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidState { .. }));
        assert_eq!(o.state, OrderState::Cancelled);
    }

    #[test]
    fn test_capacity_lookup() {
        let o = order();
        assert_eq!(o.capacity_for("extra"), Some(100));
        assert_eq!(o.capacity_for("segunda"), None);
    }
}
