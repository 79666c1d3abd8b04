//! Price history store - Append-only log of observed prices.
//!
//! Each entry records that a user paid a unit price for a product on a date at a place.
//! Entries are appended by the purchase reconciler (one per purchase item) and can only be
//! removed explicitly by their owner or an administrator. The store also answers the
//! aggregate questions used by price reports: lowest/highest price, first/last observation,
//! count, and the plain full-history average.

use crate::{
    core::{
        access::{RequestContext, ensure_access, ensure_admin},
        decimal::storage_precision,
        product::get_product_by_id,
    },
    entities::{PriceHistory, price_history},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    QueryOrder, QuerySelect, Set,
    prelude::*,
    sea_query::{Expr, Func, SimpleExpr},
};
use tracing::{debug, info, instrument};

/// Input for [`append_entry`].
#[derive(Debug, Clone)]
pub struct NewPriceHistory {
    /// Observed product
    pub product_id: i64,
    /// User who paid
    pub user_id: i64,
    /// When the purchase happened
    pub purchase_date: DateTime<Utc>,
    /// Where the purchase happened
    pub purchase_place: String,
    /// Unit price paid
    pub price_paid: f64,
}

/// Inclusive purchase-date range for [`list_for_product`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Earliest purchase date included
    pub start: DateTime<Utc>,
    /// Latest purchase date included
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Builds a range, rejecting one whose start is after its end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::validation("date range start is after its end"));
        }
        Ok(Self { start, end })
    }
}

/// Aggregates over a product's live price history.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceStatistics {
    /// Lowest price paid, 0 without entries
    pub lowest_price: f64,
    /// Highest price paid, 0 without entries
    pub highest_price: f64,
    /// Earliest purchase date
    pub first_date: Option<DateTime<Utc>>,
    /// Latest purchase date
    pub last_date: Option<DateTime<Utc>>,
    /// Number of entries
    pub count: u64,
}

fn live() -> sea_orm::Condition {
    sea_orm::Condition::all().add(price_history::Column::IsDeleted.eq(false))
}

/// Appends a price observation for an existing product.
///
/// The price is stored at storage precision.
///
/// # Errors
/// Returns `Error::ProductNotFound` if the product is missing, `Error::InvalidAmount` for a
/// negative or non-finite price, or a database error if the insert fails.
pub async fn append_entry<C>(db: &C, new: NewPriceHistory) -> Result<price_history::Model>
where
    C: ConnectionTrait,
{
    if !new.price_paid.is_finite() || new.price_paid < 0.0 {
        return Err(Error::InvalidAmount {
            amount: new.price_paid,
        });
    }
    let product = get_product_by_id(db, new.product_id).await?;

    let now = Utc::now();
    let entry = price_history::ActiveModel {
        product_id: Set(product.id),
        user_id: Set(new.user_id),
        purchase_date: Set(new.purchase_date),
        purchase_place: Set(new.purchase_place),
        price_paid: Set(storage_precision(new.price_paid)),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = entry.insert(db).await?;
    debug!(
        "Recorded price {} for product {} (entry {})",
        created.price_paid, created.product_id, created.id
    );
    Ok(created)
}

async fn find_live_entry(db: &DatabaseConnection, entry_id: i64) -> Result<price_history::Model> {
    PriceHistory::find_by_id(entry_id)
        .filter(live())
        .one(db)
        .await?
        .ok_or(Error::PriceHistoryNotFound { id: entry_id })
}

/// Retrieves a price history entry visible to the requester.
///
/// # Errors
/// Returns `Error::PriceHistoryNotFound` if absent, `Error::Unauthorized` if the requester is
/// neither the entry's user nor an admin.
pub async fn get_entry(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    entry_id: i64,
) -> Result<price_history::Model> {
    let entry = find_live_entry(db, entry_id).await?;
    ensure_access(ctx, entry.user_id, "get price history entry")?;
    Ok(entry)
}

/// Lists a product's price history, newest purchase first, optionally limited to an
/// inclusive date range.
///
/// # Errors
/// Returns `Error::ProductNotFound` if the product does not exist.
pub async fn list_for_product(
    db: &DatabaseConnection,
    product_id: i64,
    range: Option<DateRange>,
) -> Result<Vec<price_history::Model>> {
    get_product_by_id(db, product_id).await?;

    let mut query = PriceHistory::find()
        .filter(live())
        .filter(price_history::Column::ProductId.eq(product_id));
    if let Some(range) = range {
        query = query.filter(price_history::Column::PurchaseDate.between(range.start, range.end));
    }

    query
        .order_by_desc(price_history::Column::PurchaseDate)
        .order_by_desc(price_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every entry recorded for a user, newest purchase first.
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<price_history::Model>> {
    PriceHistory::find()
        .filter(live())
        .filter(price_history::Column::UserId.eq(user_id))
        .order_by_desc(price_history::Column::PurchaseDate)
        .order_by_desc(price_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists all live entries. Admin only.
pub async fn list_all(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<price_history::Model>> {
    ensure_admin(ctx, "list price history")?;
    PriceHistory::find()
        .filter(live())
        .order_by_desc(price_history::Column::PurchaseDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Soft deletes an entry. Only its user or an admin may do this.
///
/// # Errors
/// Returns `Error::PriceHistoryNotFound` if absent, `Error::Unauthorized` if not permitted.
#[instrument(skip(db))]
pub async fn delete_entry(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    entry_id: i64,
) -> Result<()> {
    let entry = find_live_entry(db, entry_id).await?;
    ensure_access(ctx, entry.user_id, "delete price history entry")?;

    let now = Utc::now();
    let mut entry: price_history::ActiveModel = entry.into();
    entry.is_deleted = Set(true);
    entry.deleted_at = Set(Some(now));
    entry.updated_at = Set(now);
    entry.update(db).await?;

    info!("Deleted price history entry {}", entry_id);
    Ok(())
}

/// Computes lowest/highest price, first/last date and count over a product's live history.
pub async fn price_statistics(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<PriceStatistics> {
    let (lowest, highest, count): (Option<f64>, Option<f64>, i64) = PriceHistory::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::min(Expr::col(price_history::Column::PricePaid))),
            "lowest_price",
        )
        .column_as(
            SimpleExpr::from(Func::max(Expr::col(price_history::Column::PricePaid))),
            "highest_price",
        )
        .column_as(
            SimpleExpr::from(Func::count(Expr::col(price_history::Column::Id))),
            "records",
        )
        .filter(live())
        .filter(price_history::Column::ProductId.eq(product_id))
        .into_tuple()
        .one(db)
        .await?
        .unwrap_or((None, None, 0));

    let first = PriceHistory::find()
        .filter(live())
        .filter(price_history::Column::ProductId.eq(product_id))
        .order_by_asc(price_history::Column::PurchaseDate)
        .one(db)
        .await?;
    let last = PriceHistory::find()
        .filter(live())
        .filter(price_history::Column::ProductId.eq(product_id))
        .order_by_desc(price_history::Column::PurchaseDate)
        .one(db)
        .await?;

    Ok(PriceStatistics {
        lowest_price: lowest.unwrap_or(0.0),
        highest_price: highest.unwrap_or(0.0),
        first_date: first.map(|e| e.purchase_date),
        last_date: last.map(|e| e.purchase_date),
        count: u64::try_from(count).unwrap_or(0),
    })
}

/// Plain average of every live price observed for a product, at storage precision.
///
/// This is a read-only statistic and is never written back to the product, whose
/// `average_price` is the reconciler's weighted running average.
pub async fn average_price_for_product(db: &DatabaseConnection, product_id: i64) -> Result<f64> {
    let average: Option<Option<f64>> = PriceHistory::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::avg(Expr::col(price_history::Column::PricePaid))),
            "average_price",
        )
        .filter(live())
        .filter(price_history::Column::ProductId.eq(product_id))
        .into_tuple()
        .one(db)
        .await?;

    Ok(storage_precision(average.flatten().unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::access::Role;
    use crate::test_utils::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
    }

    async fn record(
        db: &DatabaseConnection,
        product_id: i64,
        user_id: i64,
        day: u32,
        price: f64,
    ) -> Result<price_history::Model> {
        append_entry(
            db,
            NewPriceHistory {
                product_id,
                user_id,
                purchase_date: at(day),
                purchase_place: "Market A".to_string(),
                price_paid: price,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_append_entry_rounds_price() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana").await?;
        let milk = create_test_product(&db, "Milk").await?;

        let entry = record(&db, milk.id, user.id, 1, 4.999_96).await?;
        assert_eq!(entry.price_paid, 5.0);
        assert_eq!(entry.purchase_place, "Market A");
        assert_eq!(entry.purchase_date, at(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_append_entry_requires_product() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana").await?;

        let result = record(&db, 404, user.id, 1, 1.0).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 404 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_for_product_orders_and_filters_range() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana").await?;
        let milk = create_test_product(&db, "Milk").await?;
        let bread = create_test_product(&db, "Bread").await?;

        record(&db, milk.id, user.id, 1, 5.0).await?;
        record(&db, milk.id, user.id, 10, 6.0).await?;
        record(&db, milk.id, user.id, 20, 7.0).await?;
        record(&db, bread.id, user.id, 5, 3.0).await?;

        let all = list_for_product(&db, milk.id, None).await?;
        let prices: Vec<f64> = all.iter().map(|e| e.price_paid).collect();
        assert_eq!(prices, vec![7.0, 6.0, 5.0]);

        // Bounds are inclusive
        let range = DateRange::new(at(1), at(10))?;
        let bounded = list_for_product(&db, milk.id, Some(range)).await?;
        let prices: Vec<f64> = bounded.iter().map(|e| e.price_paid).collect();
        assert_eq!(prices, vec![6.0, 5.0]);

        let missing = list_for_product(&db, 999, None).await;
        assert!(matches!(
            missing.unwrap_err(),
            Error::ProductNotFound { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(at(2), at(1)).is_err());
        assert!(DateRange::new(at(1), at(1)).is_ok());
    }

    #[tokio::test]
    async fn test_entry_access_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner").await?;
        let other = create_test_user(&db, "other").await?;
        let admin = create_test_admin(&db, "admin").await?;
        let milk = create_test_product(&db, "Milk").await?;
        let entry = record(&db, milk.id, owner.id, 1, 5.0).await?;

        let owner_ctx = RequestContext::new(owner.id, Role::Standard);
        let other_ctx = RequestContext::new(other.id, Role::Standard);
        let admin_ctx = RequestContext::new(admin.id, Role::Admin);

        assert_eq!(get_entry(&db, &owner_ctx, entry.id).await?.id, entry.id);
        assert_eq!(get_entry(&db, &admin_ctx, entry.id).await?.id, entry.id);
        assert!(matches!(
            get_entry(&db, &other_ctx, entry.id).await.unwrap_err(),
            Error::Unauthorized { .. }
        ));

        assert!(matches!(
            delete_entry(&db, &other_ctx, entry.id).await.unwrap_err(),
            Error::Unauthorized { .. }
        ));
        delete_entry(&db, &owner_ctx, entry.id).await?;
        assert!(matches!(
            get_entry(&db, &admin_ctx, entry.id).await.unwrap_err(),
            Error::PriceHistoryNotFound { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_all_is_admin_only() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana").await?;
        let milk = create_test_product(&db, "Milk").await?;
        record(&db, milk.id, user.id, 1, 5.0).await?;

        let result = list_all(&db, &RequestContext::new(user.id, Role::Standard)).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthorized { .. }));

        let all = list_all(&db, &RequestContext::new(user.id, Role::Admin)).await?;
        assert_eq!(all.len(), 1);

        let mine = list_for_user(&db, user.id).await?;
        assert_eq!(mine.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_statistics_and_average() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana").await?;
        let milk = create_test_product(&db, "Milk").await?;

        record(&db, milk.id, user.id, 10, 6.0).await?;
        record(&db, milk.id, user.id, 1, 4.0).await?;
        record(&db, milk.id, user.id, 20, 5.0).await?;
        let removed = record(&db, milk.id, user.id, 25, 100.0).await?;
        delete_entry(&db, &RequestContext::new(user.id, Role::Standard), removed.id).await?;

        let stats = price_statistics(&db, milk.id).await?;
        assert_eq!(stats.lowest_price, 4.0);
        assert_eq!(stats.highest_price, 6.0);
        assert_eq!(stats.first_date, Some(at(1)));
        assert_eq!(stats.last_date, Some(at(20)));
        assert_eq!(stats.count, 3);

        assert_eq!(average_price_for_product(&db, milk.id).await?, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_statistics_without_history() -> Result<()> {
        let db = setup_test_db().await?;
        let milk = create_test_product(&db, "Milk").await?;

        let stats = price_statistics(&db, milk.id).await?;
        assert_eq!(stats.count, 0);
        assert_eq!(stats.lowest_price, 0.0);
        assert!(stats.first_date.is_none());
        assert_eq!(average_price_for_product(&db, milk.id).await?, 0.0);
        Ok(())
    }
}
