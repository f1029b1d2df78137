use chrono::Utc;
use contracts::domain::a001_inbound_order::{InboundOrder, InboundOrderId, OrderState};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_inbound_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub supplier: String,
    pub received_weight_kg: f64,
    pub state: String,
    pub classification_limits_json: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for InboundOrder {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> anyhow::Result<Self> {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id)?;
        let state = OrderState::from_code(&m.state)
            .ok_or_else(|| anyhow::anyhow!("Unknown order state '{}' for {}", m.state, m.code))?;
        let classification_limits =
            serde_json::from_str(&m.classification_limits_json).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to deserialize classification_limits_json for {}: {}",
                    m.code,
                    e
                )
            })?;

        Ok(InboundOrder {
            base: BaseAggregate::with_metadata(
                InboundOrderId(uuid),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            supplier: m.supplier,
            received_weight_kg: m.received_weight_kg,
            state,
            classification_limits,
        })
    }
}

fn to_active(aggregate: &InboundOrder) -> anyhow::Result<ActiveModel> {
    Ok(ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        supplier: Set(aggregate.supplier.clone()),
        received_weight_kg: Set(aggregate.received_weight_kg),
        state: Set(aggregate.state.code().to_string()),
        classification_limits_json: Set(serde_json::to_string(&aggregate.classification_limits)?),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    })
}

pub async fn list_all() -> anyhow::Result<Vec<InboundOrder>> {
    Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .order_by_desc(Column::CreatedAt)
        .all(get_connection()?)
        .await?
        .into_iter()
        .map(InboundOrder::try_from)
        .collect()
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<InboundOrder>> {
    let result = Entity::find_by_id(id.to_string())
        .one(get_connection()?)
        .await?;
    result.map(InboundOrder::try_from).transpose()
}

pub async fn insert(aggregate: &InboundOrder) -> anyhow::Result<Uuid> {
    to_active(aggregate)?.insert(get_connection()?).await?;
    Ok(aggregate.base.id.value())
}

pub async fn update(aggregate: &InboundOrder) -> anyhow::Result<()> {
    let mut active = to_active(aggregate)?;
    active.created_at = sea_orm::ActiveValue::NotSet;
    active.update(get_connection()?).await?;
    Ok(())
}
