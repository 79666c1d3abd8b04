//! Product entity - Represents a grocery item that can be purchased.
//!
//! Products carry an optional barcode (unique among live products) and a running
//! weighted average unit price maintained by the purchase reconciler.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Milk", "Bread")
    pub name: String,
    /// Optional barcode, `None` when the product has none
    pub barcode: Option<String>,
    /// Weighted average unit price; zero until the first purchase
    pub average_price: f64,
    /// Soft delete flag - if true, product is hidden but history still references it
    pub is_deleted: bool,
    /// When the product was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One product appears in many purchase items
    #[sea_orm(has_many = "super::purchase_item::Entity")]
    PurchaseItems,
    /// One product has many price observations
    #[sea_orm(has_many = "super::price_history::Entity")]
    PriceHistory,
}

impl Related<super::purchase_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseItems.def()
    }
}

impl Related<super::price_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
