//! Shared test utilities for the grocery ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        access::Role,
        product::{self, NewProduct},
        user::{self, NewUser},
    },
    entities,
    errors::Result,
};
use sea_orm::{ConnectOptions, DatabaseConnection};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness so it shows up for failing tests.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

async fn create_user_with_role(
    db: &DatabaseConnection,
    name: &str,
    role: Role,
) -> Result<entities::user::Model> {
    user::create_user(
        db,
        NewUser {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "test-hash".to_string(),
            role: role.as_str().to_string(),
        },
    )
    .await
}

/// Creates a standard user.
///
/// # Defaults
/// * `email`: `"{name}@example.com"`
/// * `role`: `"Standard"`
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<entities::user::Model> {
    create_user_with_role(db, name, Role::Standard).await
}

/// Creates an admin user.
pub async fn create_test_admin(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::user::Model> {
    create_user_with_role(db, name, Role::Admin).await
}

/// Creates a product with no barcode and a zero average price.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            barcode: None,
        },
    )
    .await
}

/// Creates a product with a barcode.
pub async fn create_test_product_with_barcode(
    db: &DatabaseConnection,
    name: &str,
    barcode: &str,
) -> Result<entities::product::Model> {
    product::create_product(
        db,
        NewProduct {
            name: name.to_string(),
            barcode: Some(barcode.to_string()),
        },
    )
    .await
}

/// Sets up a complete test environment with a standard user and one product.
/// Returns (db, user, product) for purchase-related tests.
pub async fn setup_with_user_and_product(
    product_name: &str,
) -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::product::Model,
)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "ana").await?;
    let product = create_test_product(&db, product_name).await?;
    Ok((db, user, product))
}
