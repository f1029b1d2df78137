use serde::{de::DeserializeOwned, Serialize};
use std::hash::Hash;

/// Трейт для типов идентификаторов агрегатов склада
///
/// Строковое представление используется как ключ строки в кэше
/// и в координаторе правок, поэтому оно должно быть стабильным.
pub trait AggregateId:
    Clone + Copy + PartialEq + Eq + Hash + Serialize + DeserializeOwned + std::fmt::Debug
{
    /// Преобразовать ID в строку
    fn as_string(&self) -> String;

    /// Создать ID из строки
    fn from_string(s: &str) -> Result<Self, String>;
}

/// Разбор UUID для newtype-идентификаторов
pub fn parse_uuid(s: &str) -> Result<uuid::Uuid, String> {
    uuid::Uuid::parse_str(s.trim()).map_err(|e| format!("Invalid UUID '{}': {}", s, e))
}

impl AggregateId for uuid::Uuid {
    fn as_string(&self) -> String {
        ToString::to_string(self)
    }

    fn from_string(s: &str) -> Result<Self, String> {
        parse_uuid(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid_trims_whitespace() {
        let id = uuid::Uuid::new_v4();
        let parsed = parse_uuid(&format!("  {}  ", id)).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        let err = parse_uuid("P-001").unwrap_err();
        assert!(err.contains("P-001"));
    }
}
