//! Purchase item entity - One product line within a purchase.
//!
//! Quantity, unit price and total price are stored at storage precision (4 digits), with
//! `total_price == storage_precision(quantity * unit_price)`.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent purchase
    pub purchase_id: i64,
    /// Purchased product
    pub product_id: i64,
    /// Quantity bought
    pub quantity: f64,
    /// Price per unit
    pub unit_price: f64,
    /// `quantity * unit_price`
    pub total_price: f64,
    /// Product average just before this purchase was folded in, unset until then
    pub average_before: Option<f64>,
    /// Product average this purchase produced, unset until folded in
    pub average_after: Option<f64>,
    /// Soft delete flag, set together with the parent purchase
    pub is_deleted: bool,
    /// When the item was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the item was recorded
    pub created_at: DateTimeUtc,
    /// When the item was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `PurchaseItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id"
    )]
    Purchase,
    /// Each item references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
