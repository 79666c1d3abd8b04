//! Price report generation.
//!
//! Combines a product's ledger data with its price history aggregates into one structure
//! that the presentation layer can render. Two averages are reported side by side and never
//! merged: the ledger's weighted running average, and the plain mean of every observation.

use crate::{
    core::{
        price_history::{average_price_for_product, price_statistics},
        product::get_product_by_id,
    },
    entities::product,
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

/// Price analytics for a single product.
#[derive(Debug, Clone)]
pub struct PriceReport {
    /// The product being reported on
    pub product: product::Model,
    /// Mean of all live price history entries
    pub history_average_price: f64,
    /// Weighted running average kept on the product
    pub ledger_average_price: f64,
    /// Lowest price observed
    pub lowest_price: f64,
    /// Highest price observed
    pub highest_price: f64,
    /// Spread between lowest and highest as a percentage of the lowest
    pub price_variation_percent: f64,
    /// Number of observations
    pub records_count: u64,
    /// Earliest observation
    pub first_record_date: Option<DateTime<Utc>>,
    /// Latest observation
    pub last_record_date: Option<DateTime<Utc>>,
}

/// Generates the price report for a product.
///
/// # Errors
/// Returns `Error::ProductNotFound` if the product does not exist, or a database error.
pub async fn generate_price_report(db: &DatabaseConnection, product_id: i64) -> Result<PriceReport> {
    let product = get_product_by_id(db, product_id).await?;
    let stats = price_statistics(db, product_id).await?;
    let history_average_price = average_price_for_product(db, product_id).await?;

    Ok(PriceReport {
        ledger_average_price: product.average_price,
        product,
        history_average_price,
        lowest_price: stats.lowest_price,
        highest_price: stats.highest_price,
        price_variation_percent: calculate_variation(stats.lowest_price, stats.highest_price),
        records_count: stats.count,
        first_record_date: stats.first_date,
        last_record_date: stats.last_date,
    })
}

/// Percentage spread between the lowest and highest observed price.
///
/// Returns 0 when the lowest price is not positive, since the ratio is meaningless there.
#[must_use]
pub fn calculate_variation(lowest: f64, highest: f64) -> f64 {
    if lowest <= 0.0 {
        return 0.0;
    }

    ((highest - lowest) / lowest) * 100.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::price_history::{NewPriceHistory, append_entry};
    use crate::errors::Error;
    use crate::test_utils::*;
    use chrono::TimeZone;

    #[test]
    fn test_calculate_variation() {
        assert_eq!(calculate_variation(4.0, 5.0), 25.0);
        assert_eq!(calculate_variation(5.0, 5.0), 0.0);
        assert_eq!(calculate_variation(0.0, 5.0), 0.0);
    }

    #[tokio::test]
    async fn test_generate_price_report() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana").await?;
        let milk = create_test_product(&db, "Milk").await?;

        for (day, price) in [(1, 4.0), (2, 5.0), (3, 6.0)] {
            append_entry(
                &db,
                NewPriceHistory {
                    product_id: milk.id,
                    user_id: user.id,
                    purchase_date: Utc.with_ymd_and_hms(2024, 2, day, 9, 0, 0).unwrap(),
                    purchase_place: "Corner Shop".to_string(),
                    price_paid: price,
                },
            )
            .await?;
        }

        let report = generate_price_report(&db, milk.id).await?;
        assert_eq!(report.product.id, milk.id);
        assert_eq!(report.history_average_price, 5.0);
        assert_eq!(report.ledger_average_price, 0.0);
        assert_eq!(report.lowest_price, 4.0);
        assert_eq!(report.highest_price, 6.0);
        assert_eq!(report.price_variation_percent, 50.0);
        assert_eq!(report.records_count, 3);
        assert_eq!(
            report.first_record_date,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_report_for_missing_product() -> Result<()> {
        let db = setup_test_db().await?;
        let result = generate_price_report(&db, 12).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ProductNotFound { id: 12 }
        ));
        Ok(())
    }
}
