//! Price history entity - An observation that a user paid a price for a product.
//!
//! Entries are appended once per purchase item when a purchase is recorded and are only
//! removed explicitly; deleting the originating purchase leaves them in place.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Price history database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_history")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Observed product
    pub product_id: i64,
    /// User who paid the price
    pub user_id: i64,
    /// When the purchase happened
    pub purchase_date: DateTimeUtc,
    /// Where the purchase happened
    pub purchase_place: String,
    /// Unit price paid at storage precision
    pub price_paid: f64,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the entry was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the entry was recorded
    pub created_at: DateTimeUtc,
    /// When the entry was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `PriceHistory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    /// Each entry belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
