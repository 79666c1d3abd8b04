//! Purchase entity - A single checkout event by a user at a place and time.
//!
//! `total` always equals the storage-precision sum of the item totals. Purchases are
//! never edited after creation, only soft deleted together with their items.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    /// Unique identifier for the purchase
    #[sea_orm(primary_key)]
    pub id: i64,
    /// When the purchase happened
    pub purchase_date: DateTimeUtc,
    /// Free-text location (store name, market, ...)
    pub purchase_location: String,
    /// Owning user
    pub user_id: i64,
    /// Sum of the item totals at storage precision
    pub total: f64,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the purchase was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the purchase was recorded
    pub created_at: DateTimeUtc,
    /// When the purchase was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Purchase and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each purchase belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One purchase has many items
    #[sea_orm(has_many = "super::purchase_item::Entity")]
    Items,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::purchase_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
