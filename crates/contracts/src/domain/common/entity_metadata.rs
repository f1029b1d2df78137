use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Служебные поля записи склада (заказа, паллеты, заказа клиента)
///
/// Клиент получает их вместе со снимком строки, но при записи снимка сервер
/// берёт их из своей копии.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub created_at: DateTime<Utc>,
    /// Меняется при любой локальной правке, в том числе несохранённой
    pub updated_at: DateTime<Utc>,
    /// Удалённая паллета не входит ни в лимит классификации, ни в сводку
    pub is_deleted: bool,
    /// Счётчик сохранений на сервере. Номер правки строки на клиенте
    /// ведёт координатор правок отдельно.
    pub version: i32,
}

impl EntityMetadata {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            is_deleted: false,
            version: 0,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Вызывается сервисом перед записью в БД
    pub fn bump(&mut self) {
        self.version += 1;
        self.touch();
    }
}

impl Default for EntityMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_counts_saves_only() {
        let mut metadata = EntityMetadata::new();
        metadata.touch();
        assert_eq!(metadata.version, 0);

        metadata.bump();
        metadata.bump();
        assert_eq!(metadata.version, 2);
        assert!(metadata.updated_at >= metadata.created_at);
    }
}
