//! Purchase reconciler - Records purchases and keeps derived price data consistent.
//!
//! A submission runs through fixed steps: validate the request, reject a duplicate of an
//! existing purchase, resolve every item against the product ledger and compute its totals,
//! write the purchase and its items in one transaction, append one price history entry per
//! item, and fold the purchase into each product's weighted average price.
//!
//! Everything up to and including the write is authoritative and reported to the caller.
//! The price history and average steps run after commit and are best-effort: their failures
//! are logged and never undo or fail the purchase.
//!
//! Deletion reverses the average update of every product in the purchase and tombstones the
//! purchase and its items, all in one transaction. Price history entries written for the
//! purchase are left in place.

use crate::{
    core::{
        access::{RequestContext, ensure_access, ensure_admin},
        decimal::{STORAGE_EPSILON, storage_precision},
        locks::KeyedLocks,
        price_history::{NewPriceHistory, append_entry},
        product::{get_product_by_id, set_average_price},
    },
    entities::{Purchase, PurchaseItem, purchase, purchase_item},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Two purchases by the same user at the same place closer than this are duplicates.
pub const DUPLICATE_TOLERANCE_SECONDS: i64 = 1;

/// Weight of the existing average in an update
pub const HISTORY_WEIGHT: f64 = 0.8;

/// Weight of the newest observation in an update
pub const NEWEST_WEIGHT: f64 = 0.2;

/// One line of a purchase request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchaseItem {
    /// Purchased product
    pub product_id: i64,
    /// Quantity bought, must be positive
    pub quantity: f64,
    /// Price per unit, must be positive
    pub unit_price: f64,
}

/// A purchase request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    /// When the purchase happened
    pub purchase_date: DateTime<Utc>,
    /// Where the purchase happened
    pub purchase_location: String,
    /// Purchased items, at least one
    pub items: Vec<NewPurchaseItem>,
}

/// A purchase together with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseWithItems {
    /// The purchase row
    pub purchase: purchase::Model,
    /// Its items, in insertion order
    pub items: Vec<purchase_item::Model>,
}

/// Weighted average after observing `observed`.
///
/// With no prior average (zero) the observation becomes the average.
#[must_use]
pub fn next_average(current: f64, observed: f64) -> f64 {
    if current == 0.0 {
        return storage_precision(observed);
    }
    storage_precision(current.mul_add(HISTORY_WEIGHT, observed * NEWEST_WEIGHT))
}

/// Inverse of [`next_average`]: the average before `observed` was folded in.
///
/// A non-positive result means no reliable history is left and yields zero.
#[must_use]
pub fn previous_average(current: f64, observed: f64) -> f64 {
    let prior = observed.mul_add(-NEWEST_WEIGHT, current) / HISTORY_WEIGHT;
    if prior <= 0.0 {
        return 0.0;
    }
    storage_precision(prior)
}

/// Quantity and spend of one product within a purchase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ProductSpend {
    quantity: f64,
    spent: f64,
}

impl ProductSpend {
    /// Quantity-weighted unit price paid in this purchase.
    fn observed_unit_price(self) -> f64 {
        if self.quantity <= 0.0 {
            return 0.0;
        }
        storage_precision(self.spent / self.quantity)
    }
}

fn summarize_by_product(items: &[purchase_item::Model]) -> BTreeMap<i64, ProductSpend> {
    let mut summary: BTreeMap<i64, ProductSpend> = BTreeMap::new();
    for item in items {
        let entry = summary.entry(item.product_id).or_default();
        entry.quantity += item.quantity;
        entry.spent += item.total_price;
    }
    summary
}

fn validate(new: &NewPurchase) -> Result<()> {
    if new.items.is_empty() {
        return Err(Error::validation("empty purchase"));
    }
    if new.purchase_location.trim().is_empty() {
        return Err(Error::validation("purchase location is required"));
    }
    for item in &new.items {
        for amount in [item.quantity, item.unit_price] {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(Error::InvalidAmount { amount });
            }
        }
    }
    Ok(())
}

fn rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Resolved purchase line, ready to persist.
#[derive(Debug, Clone, Copy)]
struct ResolvedItem {
    product_id: i64,
    quantity: f64,
    unit_price: f64,
    total_price: f64,
}

/// Orchestrates purchase creation and deletion.
///
/// Owns two lock tables: one per product, held across every read-modify-write of
/// `average_price`, and one per user, held across the duplicate check and the insert.
#[derive(Debug, Clone)]
pub struct PurchaseReconciler {
    db: DatabaseConnection,
    product_locks: KeyedLocks,
    user_locks: KeyedLocks,
}

impl PurchaseReconciler {
    /// Creates a reconciler over `db`.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            product_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
        }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Records a purchase owned by the requesting user.
    ///
    /// # Errors
    /// - `Error::Validation` / `Error::InvalidAmount` for an empty or malformed request
    /// - `Error::DuplicatePurchase` if the user already recorded a purchase at the same
    ///   location within one second of the same date
    /// - `Error::ProductNotFound` if an item references a missing product
    /// - `Error::Database` if the lookup or the transactional write fails
    #[instrument(skip(self, new), fields(user_id = ctx.user_id))]
    pub async fn create_purchase(
        &self,
        ctx: &RequestContext,
        new: NewPurchase,
    ) -> Result<PurchaseWithItems> {
        validate(&new)?;
        let location = new.purchase_location.trim().to_string();

        let recorded = {
            let _user_guard = self.user_locks.lock(ctx.user_id).await;

            if let Some(existing) = self
                .find_duplicate(ctx.user_id, new.purchase_date, &location)
                .await?
            {
                debug!("Purchase duplicates existing purchase {}", existing.id);
                return Err(Error::DuplicatePurchase {
                    location,
                    date: rfc3339(new.purchase_date),
                });
            }

            let (items, total) = self.resolve_items(&new.items).await?;
            self.persist(ctx.user_id, new.purchase_date, location, &items, total)
                .await?
        };

        info!(
            "Recorded purchase {} for user {}: {} items, total {}",
            recorded.purchase.id,
            recorded.purchase.user_id,
            recorded.items.len(),
            recorded.purchase.total
        );

        self.propagate_price_history(&recorded).await;
        self.apply_average_updates(&recorded).await;

        Ok(recorded)
    }

    async fn find_duplicate(
        &self,
        user_id: i64,
        date: DateTime<Utc>,
        location: &str,
    ) -> Result<Option<purchase::Model>> {
        let tolerance = Duration::seconds(DUPLICATE_TOLERANCE_SECONDS);
        Purchase::find()
            .filter(purchase::Column::UserId.eq(user_id))
            .filter(purchase::Column::PurchaseLocation.eq(location))
            .filter(purchase::Column::PurchaseDate.between(date - tolerance, date + tolerance))
            .filter(purchase::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn resolve_items(&self, items: &[NewPurchaseItem]) -> Result<(Vec<ResolvedItem>, f64)> {
        let mut resolved = Vec::with_capacity(items.len());
        let mut total = 0.0;

        for item in items {
            get_product_by_id(&self.db, item.product_id).await?;

            let unit_price = storage_precision(item.unit_price);
            let quantity = storage_precision(item.quantity);
            let total_price = storage_precision(quantity * unit_price);
            total = storage_precision(total + total_price);

            resolved.push(ResolvedItem {
                product_id: item.product_id,
                quantity,
                unit_price,
                total_price,
            });
        }

        Ok((resolved, total))
    }

    async fn persist(
        &self,
        user_id: i64,
        purchase_date: DateTime<Utc>,
        location: String,
        items: &[ResolvedItem],
        total: f64,
    ) -> Result<PurchaseWithItems> {
        let duplicate = || Error::DuplicatePurchase {
            location: location.clone(),
            date: rfc3339(purchase_date),
        };

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let purchase = purchase::ActiveModel {
            purchase_date: Set(purchase_date),
            purchase_location: Set(location.clone()),
            user_id: Set(user_id),
            total: Set(total),
            is_deleted: Set(false),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| Error::from(e).on_unique_violation(duplicate))?;

        let mut stored_items = Vec::with_capacity(items.len());
        for item in items {
            let stored = purchase_item::ActiveModel {
                purchase_id: Set(purchase.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.total_price),
                average_before: Set(None),
                average_after: Set(None),
                is_deleted: Set(false),
                deleted_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            stored_items.push(stored);
        }

        txn.commit().await?;

        Ok(PurchaseWithItems {
            purchase,
            items: stored_items,
        })
    }

    /// Appends one price history entry per item. Failures are logged and skipped.
    async fn propagate_price_history(&self, recorded: &PurchaseWithItems) {
        for item in &recorded.items {
            let entry = NewPriceHistory {
                product_id: item.product_id,
                user_id: recorded.purchase.user_id,
                purchase_date: recorded.purchase.purchase_date,
                purchase_place: recorded.purchase.purchase_location.clone(),
                price_paid: item.unit_price,
            };
            if let Err(e) = append_entry(&self.db, entry).await {
                warn!(
                    "Price history for item {} of purchase {} not recorded: {}",
                    item.id, recorded.purchase.id, e
                );
            }
        }
    }

    /// Folds the purchase into each product's average. Failures are logged and skipped.
    async fn apply_average_updates(&self, recorded: &PurchaseWithItems) {
        for (product_id, spend) in summarize_by_product(&recorded.items) {
            let _guard = self.product_locks.lock(product_id).await;
            let observed = spend.observed_unit_price();

            let result = async {
                let txn = self.db.begin().await?;
                let product = get_product_by_id(&txn, product_id).await?;
                let updated = next_average(product.average_price, observed);
                let stored = set_average_price(&txn, product_id, updated).await?;

                PurchaseItem::update_many()
                    .col_expr(
                        purchase_item::Column::AverageBefore,
                        Expr::value(Some(product.average_price)),
                    )
                    .col_expr(
                        purchase_item::Column::AverageAfter,
                        Expr::value(Some(stored.average_price)),
                    )
                    .filter(purchase_item::Column::PurchaseId.eq(recorded.purchase.id))
                    .filter(purchase_item::Column::ProductId.eq(product_id))
                    .exec(&txn)
                    .await?;

                txn.commit().await?;
                Ok::<_, Error>((product.average_price, stored.average_price))
            }
            .await;

            match result {
                Ok((before, after)) => debug!(
                    "Average price of product {} moved from {} to {} (observed {})",
                    product_id, before, after, observed
                ),
                Err(e) => warn!(
                    "Average price of product {} not updated after purchase {}: {}",
                    product_id, recorded.purchase.id, e
                ),
            }
        }
    }

    async fn find_live_purchase<C>(db: &C, purchase_id: i64) -> Result<purchase::Model>
    where
        C: ConnectionTrait,
    {
        Purchase::find_by_id(purchase_id)
            .filter(purchase::Column::IsDeleted.eq(false))
            .one(db)
            .await?
            .ok_or(Error::PurchaseNotFound { id: purchase_id })
    }

    async fn load_items<C>(db: &C, purchase_id: i64) -> Result<Vec<purchase_item::Model>>
    where
        C: ConnectionTrait,
    {
        PurchaseItem::find()
            .filter(purchase_item::Column::PurchaseId.eq(purchase_id))
            .filter(purchase_item::Column::IsDeleted.eq(false))
            .order_by_asc(purchase_item::Column::Id)
            .all(db)
            .await
            .map_err(Into::into)
    }

    /// Retrieves a purchase with its items. Owner or admin only.
    ///
    /// # Errors
    /// Returns `Error::PurchaseNotFound` if absent, `Error::Unauthorized` if not permitted.
    pub async fn get_purchase(
        &self,
        ctx: &RequestContext,
        purchase_id: i64,
    ) -> Result<PurchaseWithItems> {
        let purchase = Self::find_live_purchase(&self.db, purchase_id).await?;
        ensure_access(ctx, purchase.user_id, "get purchase")?;
        let items = Self::load_items(&self.db, purchase_id).await?;
        Ok(PurchaseWithItems { purchase, items })
    }

    async fn list_where(&self, user_id: Option<i64>) -> Result<Vec<PurchaseWithItems>> {
        let mut query = Purchase::find().filter(purchase::Column::IsDeleted.eq(false));
        if let Some(user_id) = user_id {
            query = query.filter(purchase::Column::UserId.eq(user_id));
        }

        let rows = query
            .order_by_desc(purchase::Column::PurchaseDate)
            .order_by_desc(purchase::Column::Id)
            .find_with_related(PurchaseItem)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(purchase, mut items)| {
                items.retain(|item| !item.is_deleted);
                items.sort_by_key(|item| item.id);
                PurchaseWithItems { purchase, items }
            })
            .collect())
    }

    /// Lists a user's purchases, newest first. The user themself or an admin only.
    pub async fn list_purchases_for_user(
        &self,
        ctx: &RequestContext,
        user_id: i64,
    ) -> Result<Vec<PurchaseWithItems>> {
        ensure_access(ctx, user_id, "list purchases")?;
        self.list_where(Some(user_id)).await
    }

    /// Lists every live purchase, newest first. Admin only.
    pub async fn list_all_purchases(&self, ctx: &RequestContext) -> Result<Vec<PurchaseWithItems>> {
        ensure_admin(ctx, "list all purchases")?;
        self.list_where(None).await
    }

    /// Deletes a purchase, reversing its effect on product averages.
    ///
    /// The reversal, and the tombstoning of the purchase and its items, commit together.
    /// When a product's average still holds the value this purchase produced, the average
    /// it replaced is restored exactly. Otherwise later purchases moved it and the weighted
    /// update is inverted. Products whose average never saw this purchase are left alone.
    /// Price history entries recorded for the purchase are kept.
    ///
    /// # Errors
    /// Returns `Error::PurchaseNotFound` if absent or already deleted by a concurrent call,
    /// `Error::Unauthorized` if the requester is neither owner nor admin, or a database error
    /// (in which case nothing changes).
    #[instrument(skip(self), fields(user_id = ctx.user_id))]
    pub async fn delete_purchase(&self, ctx: &RequestContext, purchase_id: i64) -> Result<()> {
        let purchase = Self::find_live_purchase(&self.db, purchase_id).await?;
        ensure_access(ctx, purchase.user_id, "delete purchase")?;

        let products: Vec<i64> = Self::load_items(&self.db, purchase_id)
            .await?
            .iter()
            .map(|item| item.product_id)
            .collect();
        let _guards = self.product_locks.lock_many(products).await;

        let txn = self.db.begin().await?;

        // Re-read under the locks, another delete may have committed while we waited
        Self::find_live_purchase(&txn, purchase_id).await?;
        let items = Self::load_items(&txn, purchase_id).await?;

        for (product_id, spend) in summarize_by_product(&items) {
            let product = match get_product_by_id(&txn, product_id).await {
                Ok(product) => product,
                Err(Error::ProductNotFound { .. }) => {
                    debug!("Product {} is gone, no average to reverse", product_id);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let applied = items
                .iter()
                .find(|item| item.product_id == product_id)
                .and_then(|item| item.average_before.zip(item.average_after));
            let Some((before, after)) = applied else {
                debug!(
                    "Purchase {} never reached the average of product {}",
                    purchase_id, product_id
                );
                continue;
            };

            let restored = if (product.average_price - after).abs() < STORAGE_EPSILON / 2.0 {
                before
            } else {
                previous_average(product.average_price, spend.observed_unit_price())
            };
            set_average_price(&txn, product_id, restored).await?;
            debug!(
                "Average price of product {} restored from {} to {}",
                product_id, product.average_price, restored
            );
        }

        let now = Utc::now();
        PurchaseItem::update_many()
            .col_expr(purchase_item::Column::IsDeleted, Expr::value(true))
            .col_expr(purchase_item::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(purchase_item::Column::UpdatedAt, Expr::value(now))
            .filter(purchase_item::Column::PurchaseId.eq(purchase_id))
            .filter(purchase_item::Column::IsDeleted.eq(false))
            .exec(&txn)
            .await?;

        let tombstoned = Purchase::update_many()
            .col_expr(purchase::Column::IsDeleted, Expr::value(true))
            .col_expr(purchase::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(purchase::Column::UpdatedAt, Expr::value(now))
            .filter(purchase::Column::Id.eq(purchase_id))
            .filter(purchase::Column::IsDeleted.eq(false))
            .exec(&txn)
            .await?;
        if tombstoned.rows_affected != 1 {
            return Err(Error::PurchaseNotFound { id: purchase_id });
        }

        txn.commit().await?;
        info!("Deleted purchase {} ({} items)", purchase_id, items.len());
        Ok(())
    }
}
