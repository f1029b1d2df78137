use chrono::Utc;
use contracts::domain::a003_customer_order::{CustomerOrder, CustomerOrderId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_customer_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub customer: String,
    pub lines_json: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for CustomerOrder {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> anyhow::Result<Self> {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id)?;
        let lines = serde_json::from_str(&m.lines_json).map_err(|e| {
            anyhow::anyhow!("Failed to deserialize lines_json for {}: {}", m.code, e)
        })?;

        Ok(CustomerOrder {
            base: BaseAggregate::with_metadata(
                CustomerOrderId(uuid),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            customer: m.customer,
            lines,
        })
    }
}

pub async fn list_all() -> anyhow::Result<Vec<CustomerOrder>> {
    Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .order_by_asc(Column::Code)
        .all(get_connection()?)
        .await?
        .into_iter()
        .map(CustomerOrder::try_from)
        .collect()
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<CustomerOrder>> {
    let result = Entity::find_by_id(id.to_string())
        .one(get_connection()?)
        .await?;
    result.map(CustomerOrder::try_from).transpose()
}

pub async fn insert(aggregate: &CustomerOrder) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    let active = ActiveModel {
        id: Set(uuid.to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        customer: Set(aggregate.customer.clone()),
        lines_json: Set(serde_json::to_string(&aggregate.lines)?),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    };
    active.insert(get_connection()?).await?;
    Ok(uuid)
}
