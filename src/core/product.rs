//! Product ledger - Owns product identity, barcodes, and the running average price.
//!
//! Products are created and edited by administrators. A barcode is optional; an empty or
//! missing barcode means "no barcode" and is exempt from the uniqueness rule, while any
//! non-empty barcode must be unique among live products. The `average_price` field is
//! normally written only by the purchase reconciler through [`set_average_price`].
//! Deletion is a soft delete so purchase items and price history keep their references.

use crate::{
    core::decimal::storage_precision,
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// Input for [`create_product`].
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    /// Product name
    pub name: String,
    /// Optional barcode; `None` or an empty string means no barcode
    pub barcode: Option<String>,
}

/// Partial update for [`update_product`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    /// New name
    pub name: Option<String>,
    /// New barcode; `Some("")` clears the barcode
    pub barcode: Option<String>,
    /// New average price
    pub average_price: Option<f64>,
}

fn normalize_barcode(barcode: Option<&str>) -> Option<String> {
    barcode
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(ToString::to_string)
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Product name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_average_price(price: f64) -> Result<f64> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::InvalidAmount { amount: price });
    }
    Ok(storage_precision(price))
}

/// Retrieves all active (non-deleted) products, ordered alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_all_active_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsDeleted.eq(false))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a live product by id.
///
/// # Errors
/// Returns `Error::ProductNotFound` if the product does not exist or was deleted.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .filter(product::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })
}

/// Finds a live product by barcode, returning None if no product carries it.
pub async fn get_product_by_barcode(
    db: &DatabaseConnection,
    barcode: &str,
) -> Result<Option<product::Model>> {
    Product::find()
        .filter(product::Column::Barcode.eq(barcode))
        .filter(product::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn ensure_barcode_available(
    db: &DatabaseConnection,
    barcode: &str,
    owner_id: Option<i64>,
) -> Result<()> {
    match get_product_by_barcode(db, barcode).await? {
        Some(existing) if Some(existing.id) != owner_id => Err(Error::DuplicateBarcode {
            barcode: barcode.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Creates a new product with a zero average price.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - The barcode is already used by another live product
/// - The database insert operation fails
#[instrument(skip(db))]
pub async fn create_product(db: &DatabaseConnection, new: NewProduct) -> Result<product::Model> {
    let name = validate_name(&new.name)?;
    let barcode = normalize_barcode(new.barcode.as_deref());

    if let Some(code) = &barcode {
        ensure_barcode_available(db, code, None).await?;
    }

    let now = chrono::Utc::now();
    let model = product::ActiveModel {
        name: Set(name),
        barcode: Set(barcode.clone()),
        average_price: Set(0.0),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = model.insert(db).await.map_err(|e| {
        Error::from(e).on_unique_violation(|| Error::DuplicateBarcode {
            barcode: barcode.unwrap_or_default(),
        })
    })?;
    info!("Created product '{}' (ID: {})", created.name, created.id);
    Ok(created)
}

/// Applies a partial update to a product.
///
/// Only the fields present in `patch` change. A non-empty barcode that differs from the
/// current one is checked against every other live product; an empty barcode clears it.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist or is deleted
/// - The new name is empty
/// - The new barcode belongs to another product
/// - The new average price is negative or not finite
/// - The database update operation fails
#[instrument(skip(db))]
pub async fn update_product(
    db: &DatabaseConnection,
    product_id: i64,
    patch: ProductPatch,
) -> Result<product::Model> {
    let current = get_product_by_id(db, product_id).await?;
    let mut product: product::ActiveModel = current.clone().into();

    if let Some(name) = &patch.name {
        product.name = Set(validate_name(name)?);
    }

    if let Some(price) = patch.average_price {
        product.average_price = Set(validate_average_price(price)?);
    }

    let mut new_barcode = None;
    if let Some(raw) = &patch.barcode {
        match normalize_barcode(Some(raw)) {
            None => product.barcode = Set(None),
            Some(code) => {
                if current.barcode.as_deref() != Some(code.as_str()) {
                    ensure_barcode_available(db, &code, Some(product_id)).await?;
                }
                product.barcode = Set(Some(code.clone()));
                new_barcode = Some(code);
            }
        }
    }

    product.updated_at = Set(chrono::Utc::now());
    let updated = product.update(db).await.map_err(|e| {
        Error::from(e).on_unique_violation(|| Error::DuplicateBarcode {
            barcode: new_barcode.unwrap_or_default(),
        })
    })?;
    debug!("Updated product {}", updated.id);
    Ok(updated)
}

/// Writes a new average price for a product. Used by the purchase reconciler.
///
/// The value is clamped at zero and rounded to storage precision.
pub async fn set_average_price<C>(
    db: &C,
    product_id: i64,
    average_price: f64,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if !average_price.is_finite() {
        return Err(Error::InvalidAmount {
            amount: average_price,
        });
    }

    let mut product: product::ActiveModel = get_product_by_id(db, product_id).await?.into();
    product.average_price = Set(storage_precision(average_price.max(0.0)));
    product.updated_at = Set(chrono::Utc::now());
    product.update(db).await.map_err(Into::into)
}

/// Soft deletes a product, preserving purchase and price history references.
///
/// # Errors
/// Returns an error if:
/// - The product does not exist or is already deleted
/// - The database update operation fails
#[instrument(skip(db))]
pub async fn delete_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    let mut product: product::ActiveModel = get_product_by_id(db, product_id).await?.into();

    let now = chrono::Utc::now();
    product.is_deleted = Set(true);
    product.deleted_at = Set(Some(now));
    product.updated_at = Set(now);

    let deleted = product.update(db).await?;
    info!("Soft deleted product {}", deleted.id);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let db = setup_test_db().await?;

        // Test empty name validation
        let result = create_product(&db, NewProduct::default()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // Test whitespace-only name validation
        let result = create_product(
            &db,
            NewProduct {
                name: "   ".to_string(),
                barcode: None,
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_integration() -> Result<()> {
        let db = setup_test_db().await?;

        let product = create_product(
            &db,
            NewProduct {
                name: "  Milk ".to_string(),
                barcode: Some("7891000100103".to_string()),
            },
        )
        .await?;

        assert_eq!(product.name, "Milk");
        assert_eq!(product.barcode.as_deref(), Some("7891000100103"));
        assert_eq!(product.average_price, 0.0);
        assert!(!product.is_deleted);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_barcode_is_no_barcode() -> Result<()> {
        let db = setup_test_db().await?;

        let first = create_product(
            &db,
            NewProduct {
                name: "Bread".to_string(),
                barcode: Some(String::new()),
            },
        )
        .await?;
        let second = create_product(
            &db,
            NewProduct {
                name: "Rolls".to_string(),
                barcode: Some("  ".to_string()),
            },
        )
        .await?;

        assert!(first.barcode.is_none());
        assert!(second.barcode.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_product_with_barcode(&db, "Milk", "123").await?;

        let result = create_product(
            &db,
            NewProduct {
                name: "Other Milk".to_string(),
                barcode: Some("123".to_string()),
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::DuplicateBarcode { barcode } if barcode == "123"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_barcode_of_deleted_product_can_be_reused() -> Result<()> {
        let db = setup_test_db().await?;
        let old = create_test_product_with_barcode(&db, "Old Milk", "555").await?;
        delete_product(&db, old.id).await?;

        let new = create_test_product_with_barcode(&db, "New Milk", "555").await?;
        assert_eq!(new.barcode.as_deref(), Some("555"));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_product_by_barcode() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product_with_barcode(&db, "Coffee", "999").await?;

        let found = get_product_by_barcode(&db, "999").await?;
        assert_eq!(found.unwrap().id, product.id);
        assert!(get_product_by_barcode(&db, "000").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_get_product_by_id_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = get_product_by_id(&db, 999).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 999 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_active_products_ordered_and_excludes_deleted() -> Result<()> {
        let db = setup_test_db().await?;

        let rice = create_test_product(&db, "Rice").await?;
        let beans = create_test_product(&db, "Beans").await?;
        let gone = create_test_product(&db, "Gone").await?;
        delete_product(&db, gone.id).await?;

        let products = get_all_active_products(&db).await?;
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, beans.id);
        assert_eq!(products[1].id, rice.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_partial() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product_with_barcode(&db, "Butter", "111").await?;

        let updated = update_product(
            &db,
            product.id,
            ProductPatch {
                name: Some("Salted Butter".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.name, "Salted Butter");
        assert_eq!(updated.barcode.as_deref(), Some("111"));
        assert_eq!(updated.average_price, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_barcode_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let butter = create_test_product_with_barcode(&db, "Butter", "111").await?;
        create_test_product_with_barcode(&db, "Cheese", "222").await?;

        // Taking another product's barcode fails
        let result = update_product(
            &db,
            butter.id,
            ProductPatch {
                barcode: Some("222".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateBarcode { .. }));

        // Re-submitting its own barcode is fine
        let same = update_product(
            &db,
            butter.id,
            ProductPatch {
                barcode: Some("111".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(same.barcode.as_deref(), Some("111"));

        // Empty string clears the barcode
        let cleared = update_product(
            &db,
            butter.id,
            ProductPatch {
                barcode: Some(String::new()),
                ..Default::default()
            },
        )
        .await?;
        assert!(cleared.barcode.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_update_product_average_price_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Eggs").await?;

        let result = update_product(
            &db,
            product.id,
            ProductPatch {
                average_price: Some(-1.0),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount } if amount == -1.0
        ));

        let updated = update_product(
            &db,
            product.id,
            ProductPatch {
                average_price: Some(3.141_59),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.average_price, 3.1416);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_average_price_clamps_and_rounds() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Flour").await?;

        let updated = set_average_price(&db, product.id, 2.345_678).await?;
        assert_eq!(updated.average_price, 2.3457);

        let clamped = set_average_price(&db, product.id, -0.5).await?;
        assert_eq!(clamped.average_price, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let product = create_test_product(&db, "Juice").await?;

        let deleted = delete_product(&db, product.id).await?;
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());

        // A second delete reports the product as missing
        let result = delete_product(&db, product.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { .. }
        ));

        // The row is still there for historical references
        let row = Product::find_by_id(product.id).one(&db).await?.unwrap();
        assert!(row.is_deleted);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_product(&db, 999).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 999 }
        ));
        Ok(())
    }
}
