use chrono::Utc;
use contracts::domain::a002_pallet::{Pallet, PalletId, PalletStatus};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::shared::data::db::get_connection;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_pallet")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub comment: Option<String>,
    pub status: String,
    pub customer_order_id: Option<String>,
    pub classifications_json: String,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Pallet {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> anyhow::Result<Self> {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id)?;
        let status = PalletStatus::from_code(&m.status)
            .ok_or_else(|| anyhow::anyhow!("Unknown pallet status '{}' for {}", m.status, m.code))?;
        let classifications = serde_json::from_str(&m.classifications_json).map_err(|e| {
            anyhow::anyhow!("Failed to deserialize classifications_json for {}: {}", m.code, e)
        })?;

        Ok(Pallet {
            base: BaseAggregate::with_metadata(
                PalletId(uuid),
                m.code,
                m.description,
                m.comment,
                metadata,
            ),
            status,
            customer_order_id: m.customer_order_id,
            classifications,
        })
    }
}

fn to_active(aggregate: &Pallet) -> anyhow::Result<ActiveModel> {
    Ok(ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        comment: Set(aggregate.base.comment.clone()),
        status: Set(aggregate.status.code().to_string()),
        customer_order_id: Set(aggregate.customer_order_id.clone()),
        classifications_json: Set(serde_json::to_string(&aggregate.classifications)?),
        is_deleted: Set(aggregate.base.metadata.is_deleted),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    })
}

/// Все неудалённые паллеты, по номеру
pub async fn list_all() -> anyhow::Result<Vec<Pallet>> {
    Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .order_by_asc(Column::Code)
        .all(get_connection()?)
        .await?
        .into_iter()
        .map(Pallet::try_from)
        .collect()
}

pub async fn get_by_id(id: Uuid) -> anyhow::Result<Option<Pallet>> {
    let result = Entity::find_by_id(id.to_string())
        .one(get_connection()?)
        .await?;
    result.map(Pallet::try_from).transpose()
}

pub async fn insert(aggregate: &Pallet) -> anyhow::Result<Uuid> {
    to_active(aggregate)?.insert(get_connection()?).await?;
    Ok(aggregate.base.id.value())
}

pub async fn update(aggregate: &Pallet) -> anyhow::Result<()> {
    let mut active = to_active(aggregate)?;
    active.created_at = sea_orm::ActiveValue::NotSet;
    active.update(get_connection()?).await?;
    Ok(())
}

pub async fn soft_delete(id: Uuid) -> anyhow::Result<bool> {
    use sea_orm::sea_query::Expr;
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::IsDeleted.eq(false))
        .exec(get_connection()?)
        .await?;
    Ok(result.rows_affected > 0)
}
