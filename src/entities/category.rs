//! Category entity - A user's personal grouping of products (e.g. "Dairy", "Bakery").

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Category name
    pub name: String,
    /// Owning user
    pub user_id: i64,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the category was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the category was created
    pub created_at: DateTimeUtc,
    /// When the category was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each category belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
