//! User entity - Represents a registered account.
//!
//! Users own categories, purchases and price history entries. The role string is one of
//! `"Admin"`, `"Standard"` or `"Guest"` and drives the owner-or-admin access checks.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, unique among live users
    pub email: String,
    /// Password hash produced by the authentication layer
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role name: `"Admin"`, `"Standard"` or `"Guest"`
    pub role: String,
    /// Soft delete flag - if true, the account is hidden but data is preserved
    pub is_deleted: bool,
    /// When the account was soft deleted
    pub deleted_at: Option<DateTimeUtc>,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// When the account was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many categories
    #[sea_orm(has_many = "super::category::Entity")]
    Categories,
    /// One user has many purchases
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchases,
    /// One user has many price history entries
    #[sea_orm(has_many = "super::price_history::Entity")]
    PriceHistory,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl Related<super::price_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
