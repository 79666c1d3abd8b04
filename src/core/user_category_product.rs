//! Category links - Files a product under one of a user's categories.
//!
//! A link ties (user, category, product) together. The category must belong to the linking
//! user; products are global, so the same product may be filed differently by every user.

use crate::{
    core::{
        access::{RequestContext, ensure_access, ensure_admin},
        category::get_category_by_id,
        product::get_product_by_id,
    },
    entities::{UserCategoryProduct, user_category_product},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, instrument};

fn live() -> sea_orm::Condition {
    sea_orm::Condition::all().add(user_category_product::Column::IsDeleted.eq(false))
}

async fn find_link(
    db: &DatabaseConnection,
    user_id: i64,
    category_id: i64,
    product_id: i64,
) -> Result<Option<user_category_product::Model>> {
    UserCategoryProduct::find()
        .filter(live())
        .filter(user_category_product::Column::UserId.eq(user_id))
        .filter(user_category_product::Column::CategoryId.eq(category_id))
        .filter(user_category_product::Column::ProductId.eq(product_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Files `product_id` under `category_id` for `user_id`.
///
/// # Errors
/// - `Error::CategoryNotFound` / `Error::ProductNotFound` for missing records
/// - `Error::Unauthorized` if the category belongs to another user
/// - `Error::DuplicateLink` if the link already exists
#[instrument(skip(db))]
pub async fn create_link(
    db: &DatabaseConnection,
    user_id: i64,
    category_id: i64,
    product_id: i64,
) -> Result<user_category_product::Model> {
    let category = get_category_by_id(db, category_id).await?;
    if category.user_id != user_id {
        return Err(Error::unauthorized(
            "create category link: the category belongs to another user",
        ));
    }
    get_product_by_id(db, product_id).await?;

    if find_link(db, user_id, category_id, product_id).await?.is_some() {
        return Err(Error::DuplicateLink {
            category_id,
            product_id,
        });
    }

    let now = Utc::now();
    let link = user_category_product::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category_id),
        product_id: Set(product_id),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!("Linked product {} to category {}", product_id, category_id);
    Ok(link)
}

async fn find_live_link(
    db: &DatabaseConnection,
    link_id: i64,
) -> Result<user_category_product::Model> {
    UserCategoryProduct::find_by_id(link_id)
        .filter(live())
        .one(db)
        .await?
        .ok_or(Error::LinkNotFound { id: link_id })
}

/// Retrieves a link. Its user or an admin only.
pub async fn get_link(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    link_id: i64,
) -> Result<user_category_product::Model> {
    let link = find_live_link(db, link_id).await?;
    ensure_access(ctx, link.user_id, "get category link")?;
    Ok(link)
}

/// Lists a user's links.
pub async fn list_links_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<user_category_product::Model>> {
    UserCategoryProduct::find()
        .filter(live())
        .filter(user_category_product::Column::UserId.eq(user_id))
        .order_by_asc(user_category_product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the links of a category. Category owner or admin only.
pub async fn list_links_for_category(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    category_id: i64,
) -> Result<Vec<user_category_product::Model>> {
    let category = get_category_by_id(db, category_id).await?;
    ensure_access(ctx, category.user_id, "list category links")?;

    UserCategoryProduct::find()
        .filter(live())
        .filter(user_category_product::Column::CategoryId.eq(category_id))
        .order_by_asc(user_category_product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every live link. Admin only.
pub async fn list_all_links(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<user_category_product::Model>> {
    ensure_admin(ctx, "list all category links")?;
    UserCategoryProduct::find()
        .filter(live())
        .order_by_asc(user_category_product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn tombstone(db: &DatabaseConnection, link: user_category_product::Model) -> Result<()> {
    let now = Utc::now();
    let mut link: user_category_product::ActiveModel = link.into();
    link.is_deleted = Set(true);
    link.deleted_at = Set(Some(now));
    link.updated_at = Set(now);
    link.update(db).await?;
    Ok(())
}

/// Soft deletes a link. Its user or an admin only.
pub async fn delete_link(db: &DatabaseConnection, ctx: &RequestContext, link_id: i64) -> Result<()> {
    let link = find_live_link(db, link_id).await?;
    ensure_access(ctx, link.user_id, "delete category link")?;
    tombstone(db, link).await
}

/// Soft deletes the link between `category_id` and `product_id`.
///
/// Links belong to the category's owner, so that owner's link is removed whether the
/// owner or an admin asks. Category owner or admin only. Returns whether a link was removed.
pub async fn delete_link_by_fields(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    category_id: i64,
    product_id: i64,
) -> Result<bool> {
    let category = get_category_by_id(db, category_id).await?;
    ensure_access(ctx, category.user_id, "delete category link")?;

    match find_link(db, category.user_id, category_id, product_id).await? {
        Some(link) => {
            tombstone(db, link).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
