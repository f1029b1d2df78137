use super::EntityMetadata;
use serde::{Deserialize, Serialize};

/// Общая часть входящего заказа, паллеты и заказа клиента
///
/// `code` виден оператору на складе ("IN-7", "P-001", "CO-42"), `id`
/// используется в REST-путях и как ключ строки в таблицах.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseAggregate<Id> {
    pub id: Id,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub metadata: EntityMetadata,
}

impl<Id> BaseAggregate<Id> {
    pub fn new(id: Id, code: String, description: String) -> Self {
        Self::with_metadata(id, code, description, None, EntityMetadata::new())
    }

    /// Сборка из строки БД
    pub fn with_metadata(
        id: Id,
        code: String,
        description: String,
        comment: Option<String>,
        metadata: EntityMetadata,
    ) -> Self {
        Self {
            id,
            code,
            description,
            comment,
            metadata,
        }
    }

    pub fn touch(&mut self) {
        self.metadata.touch();
    }

    /// Неудалённая запись: учитывается в остатках и в сводке паллет
    pub fn is_active(&self) -> bool {
        !self.metadata.is_deleted
    }
}
