//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category;
pub mod price_history;
pub mod product;
pub mod purchase;
pub mod purchase_item;
pub mod user;
pub mod user_category_product;

// Re-export specific types to avoid conflicts
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use price_history::{
    Column as PriceHistoryColumn, Entity as PriceHistory, Model as PriceHistoryModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use purchase_item::{
    Column as PurchaseItemColumn, Entity as PurchaseItem, Model as PurchaseItemModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use user_category_product::{
    Column as UserCategoryProductColumn, Entity as UserCategoryProduct,
    Model as UserCategoryProductModel,
};
