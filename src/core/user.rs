//! User accounts.
//!
//! Credentials are produced and checked by the authentication layer; this module only
//! stores the hash and resolves accounts for the services that need an owner.

use crate::{
    core::access::{RequestContext, Role, ensure_access, ensure_admin},
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Password hash produced by the authentication layer
    pub password_hash: String,
    /// Role name, `Standard` when blank
    pub role: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn live() -> sea_orm::sea_query::SimpleExpr {
    user::Column::IsDeleted.eq(false)
}

/// Builds the request context of a stored account.
///
/// # Errors
/// Returns `Error::Validation` if the stored role is not a known role.
pub fn context_for(user: &user::Model) -> Result<RequestContext> {
    RequestContext::from_claims(user.id, &user.role)
}

/// Registers a new user.
///
/// # Errors
/// - `Error::Validation` if name, email or hash is blank, the email has no `@`, or the
///   role is unknown
/// - `Error::DuplicateEmail` if a live account already uses the email
#[instrument(skip(db, new), fields(email = %new.email))]
pub async fn create_user(db: &DatabaseConnection, new: NewUser) -> Result<user::Model> {
    let name = new.name.trim().to_string();
    let email = normalize_email(&new.email);

    if name.is_empty() {
        return Err(Error::validation("user name is required"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(Error::validation("a valid email is required"));
    }
    if new.password_hash.is_empty() {
        return Err(Error::validation("password hash is required"));
    }
    let role = if new.role.trim().is_empty() {
        Role::default()
    } else {
        new.role.trim().parse::<Role>()?
    };

    if find_by_email(db, &email).await?.is_some() {
        return Err(Error::DuplicateEmail { email });
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        name: Set(name),
        email: Set(email.clone()),
        password_hash: Set(new.password_hash),
        role: Set(role.as_str().to_string()),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        Error::from(e).on_unique_violation(|| Error::DuplicateEmail {
            email: email.clone(),
        })
    })?;

    info!("Registered user {} with role {}", user.id, user.role);
    Ok(user)
}

async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(live())
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a live user by id.
///
/// # Errors
/// Returns `Error::UserNotFound` if no live user has this id.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    User::find_by_id(user_id)
        .filter(live())
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            key: user_id.to_string(),
        })
}

/// Retrieves a live user by email, ignoring case and surrounding whitespace.
///
/// # Errors
/// Returns `Error::UserNotFound` if no live user has this email.
pub async fn get_user_by_email(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    let email = normalize_email(email);
    find_by_email(db, &email)
        .await?
        .ok_or(Error::UserNotFound { key: email })
}

/// Lists all live users. Admin only.
pub async fn list_users(db: &DatabaseConnection, ctx: &RequestContext) -> Result<Vec<user::Model>> {
    ensure_admin(ctx, "list users")?;
    User::find()
        .filter(live())
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Soft deletes an account. Users may delete themselves; admins may delete anyone.
pub async fn delete_user(db: &DatabaseConnection, ctx: &RequestContext, user_id: i64) -> Result<()> {
    let user = get_user_by_id(db, user_id).await?;
    ensure_access(ctx, user.id, "delete user")?;

    let now = Utc::now();
    let mut user: user::ActiveModel = user.into();
    user.is_deleted = Set(true);
    user.deleted_at = Set(Some(now));
    user.updated_at = Set(now);
    user.update(db).await?;

    info!("Deleted user {}", user_id);
    Ok(())
}
