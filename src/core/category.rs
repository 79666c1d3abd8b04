//! Categories - Per-user groupings of products.

use crate::{
    core::access::{RequestContext, ensure_access, ensure_admin},
    entities::{Category, category},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument, warn};

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("category name is required"));
    }
    Ok(name.to_string())
}

/// Creates a category owned by `user_id`.
///
/// # Errors
/// Returns `Error::Validation` for a blank name, or a database error (for instance when
/// `user_id` does not reference an existing user).
pub async fn create_category(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
) -> Result<category::Model> {
    let name = validate_name(name)?;
    let now = Utc::now();

    let category = category::ActiveModel {
        name: Set(name),
        user_id: Set(user_id),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!("Created category {} '{}' for user {}", category.id, category.name, user_id);
    Ok(category)
}

/// Retrieves a live category by id.
///
/// # Errors
/// Returns `Error::CategoryNotFound` if absent or deleted.
pub async fn get_category_by_id(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<category::Model> {
    Category::find_by_id(category_id)
        .filter(category::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or(Error::CategoryNotFound { id: category_id })
}

/// Lists a user's live categories by name.
pub async fn list_categories_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<category::Model>> {
    Category::find()
        .filter(category::Column::IsDeleted.eq(false))
        .filter(category::Column::UserId.eq(user_id))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every live category. Admin only.
pub async fn list_all_categories(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<category::Model>> {
    ensure_admin(ctx, "list all categories")?;
    Category::find()
        .filter(category::Column::IsDeleted.eq(false))
        .order_by_asc(category::Column::UserId)
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a category. Owner or admin only.
pub async fn update_category(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    category_id: i64,
    name: &str,
) -> Result<category::Model> {
    let name = validate_name(name)?;
    let category = get_category_by_id(db, category_id).await?;
    ensure_access(ctx, category.user_id, "update category")?;

    let mut category: category::ActiveModel = category.into();
    category.name = Set(name);
    category.updated_at = Set(Utc::now());
    category.update(db).await.map_err(Into::into)
}

/// Soft deletes a category. Owner or admin only.
pub async fn delete_category(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    category_id: i64,
) -> Result<()> {
    let category = get_category_by_id(db, category_id).await?;
    ensure_access(ctx, category.user_id, "delete category")?;

    let now = Utc::now();
    let mut category: category::ActiveModel = category.into();
    category.is_deleted = Set(true);
    category.deleted_at = Set(Some(now));
    category.updated_at = Set(now);
    category.update(db).await?;
    Ok(())
}

/// Creates the given categories for a new user.
///
/// A failing name is logged and skipped. Returns how many were created.
#[instrument(skip(db, names))]
pub async fn seed_default_categories<S: AsRef<str> + Sync>(
    db: &DatabaseConnection,
    user_id: i64,
    names: &[S],
) -> Result<usize> {
    let mut created = 0;
    for name in names {
        match create_category(db, user_id, name.as_ref()).await {
            Ok(_) => created += 1,
            Err(e) => warn!(
                "Default category '{}' not created for user {}: {}",
                name.as_ref(),
                user_id,
                e
            ),
        }
    }

    info!("Seeded {}/{} default categories for user {}", created, names.len(), user_id);
    Ok(created)
}
