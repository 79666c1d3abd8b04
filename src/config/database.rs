//! Database configuration module for the grocery ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Creation is idempotent so the same
//! bootstrap can run against an existing database file.
//!
//! Uniqueness rules that only apply to live (non-deleted) rows are enforced with partial
//! unique indexes: product barcodes, user emails, and the (user, date, location) triple that
//! identifies a purchase.

use crate::entities::{
    Category, PriceHistory, Product, Purchase, PurchaseItem, User, UserCategoryProduct,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info, instrument};

/// Fallback when `DATABASE_URL` is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite://grocery_ledger.sqlite?mode=rwc";

const UNIQUE_INDEXES: [&str; 3] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_products_barcode_live \
     ON products (barcode) WHERE NOT is_deleted AND barcode IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email_live \
     ON users (email) WHERE NOT is_deleted",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_purchases_user_date_location_live \
     ON purchases (user_id, purchase_date, purchase_location) WHERE NOT is_deleted",
];

const LOOKUP_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_price_history_product ON price_history (product_id)",
    "CREATE INDEX IF NOT EXISTS idx_price_history_user ON price_history (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_price_history_date ON price_history (purchase_date)",
    "CREATE INDEX IF NOT EXISTS idx_purchase_items_purchase ON purchase_items (purchase_id)",
];

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the given database URL.
#[instrument(skip(database_url))]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not already exist.
///
/// Tables are created parents-first so foreign keys always point at an existing table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Category),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Purchase),
        schema.create_table_from_entity(PurchaseItem),
        schema.create_table_from_entity(PriceHistory),
        schema.create_table_from_entity(UserCategoryProduct),
    ];

    for mut table in tables {
        table.if_not_exists();
        db.execute(builder.build(&table)).await?;
    }

    for sql in UNIQUE_INDEXES.iter().chain(LOOKUP_INDEXES.iter()) {
        db.execute_unprepared(sql).await?;
    }

    info!("Database schema is ready");
    Ok(())
}
