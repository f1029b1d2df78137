use crate::domain::common::{
    aggregate_id::parse_uuid, AggregateId, AggregateRoot, BaseAggregate, EntityMetadata,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ID типа для заказа клиента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerOrderId(pub Uuid);

impl CustomerOrderId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }
    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for CustomerOrderId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }
    fn from_string(s: &str) -> Result<Self, String> {
        parse_uuid(s).map(CustomerOrderId::new)
    }
}

/// Строка заказа клиента: сколько коробок типа/продукта нужно отгрузить
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrderLine {
    pub classification_type: String,
    pub product_id: String,
    pub required_quantity: i64,
}

/// Заказ клиента на отгрузку (агрегат a003)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOrder {
    #[serde(flatten)]
    pub base: BaseAggregate<CustomerOrderId>,

    /// Клиент
    pub customer: String,

    pub lines: Vec<CustomerOrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerOrderCreateDto {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub customer: String,
    pub lines: Vec<CustomerOrderLine>,
}

impl CustomerOrder {
    pub fn new(dto: CustomerOrderCreateDto) -> Self {
        Self {
            base: BaseAggregate::new(
                CustomerOrderId::new(Uuid::new_v4()),
                dto.code,
                dto.description,
            ),
            customer: dto.customer,
            lines: dto.lines,
        }
    }

    pub fn to_string_id(&self) -> String {
        self.base.id.as_string()
    }

    pub fn line_for(
        &self,
        classification_type: &str,
        product_id: &str,
    ) -> Option<&CustomerOrderLine> {
        self.lines
            .iter()
            .find(|l| l.classification_type == classification_type && l.product_id == product_id)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base.code.trim().is_empty() {
            return Err("Номер заказа клиента не может быть пустым".into());
        }
        if self.customer.trim().is_empty() {
            return Err("Клиент обязателен".into());
        }
        if self.lines.iter().any(|l| l.required_quantity < 0) {
            return Err("Количество в строке заказа не может быть отрицательным".into());
        }
        Ok(())
    }
}

impl AggregateRoot for CustomerOrder {
    type Id = CustomerOrderId;

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
        "a003"
    }

    fn collection_name() -> &'static str {
        "customer_order"
    }

    fn element_name() -> &'static str {
        "Заказ клиента"
    }
}
