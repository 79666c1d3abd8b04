//! User-category-product entity - Files a product under one of a user's categories.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User-category-product link database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_category_products")]
pub struct Model {
    /// Unique identifier for the link
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who filed the product
    pub user_id: i64,
    /// Category owned by that user
    pub category_id: i64,
    /// Filed product
    pub product_id: i64,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the link was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the link was created
    pub created_at: DateTimeUtc,
    /// When the link was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `UserCategoryProduct` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each link belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each link belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// Each link references one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
