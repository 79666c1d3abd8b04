//! Serializable renderings of ledger records.
//!
//! Stored values keep four decimals; views round money and quantities to two and format
//! timestamps as RFC3339. Field names are camelCase.

use crate::{
    core::{decimal::display_precision, purchase::PurchaseWithItems, report::PriceReport},
    entities::{category, price_history, product, purchase_item, user, user_category_product},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Product as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    /// Product id
    pub id: i64,
    /// Product name
    pub name: String,
    /// Barcode, if any
    pub barcode: Option<String>,
    /// Weighted average unit price, 2 decimals
    pub average_price: f64,
    /// RFC3339 creation time
    pub created_at: String,
    /// RFC3339 time of the last change
    pub updated_at: String,
}

impl From<&product::Model> for ProductView {
    fn from(product: &product::Model) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            barcode: product.barcode.clone(),
            average_price: display_precision(product.average_price),
            created_at: timestamp(product.created_at),
            updated_at: timestamp(product.updated_at),
        }
    }
}

/// Purchase line as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemView {
    /// Item id
    pub id: i64,
    /// Purchased product
    pub product_id: i64,
    /// Product name, when the caller supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Quantity bought, 2 decimals
    pub quantity: f64,
    /// Price per unit, 2 decimals
    pub unit_price: f64,
    /// Line total, 2 decimals
    pub total_price: f64,
    /// RFC3339 creation time
    pub created_at: String,
    /// RFC3339 time of the last change
    pub updated_at: String,
}

impl From<&purchase_item::Model> for PurchaseItemView {
    fn from(item: &purchase_item::Model) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: None,
            quantity: display_precision(item.quantity),
            unit_price: display_precision(item.unit_price),
            total_price: display_precision(item.total_price),
            created_at: timestamp(item.created_at),
            updated_at: timestamp(item.updated_at),
        }
    }
}

/// Purchase with its items as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    /// Purchase id
    pub id: i64,
    /// RFC3339 purchase time
    pub purchase_date: String,
    /// Where the purchase happened
    pub purchase_location: String,
    /// Purchasing user
    pub user_id: i64,
    /// Live items in id order
    pub items: Vec<PurchaseItemView>,
    /// Sum of item totals, 2 decimals
    pub total: f64,
    /// RFC3339 creation time
    pub created_at: String,
    /// RFC3339 time of the last change
    pub updated_at: String,
}

impl PurchaseView {
    /// Renders a purchase, naming each item's product when `product_names` knows it.
    #[must_use]
    pub fn with_product_names(
        recorded: &PurchaseWithItems,
        product_names: &HashMap<i64, String>,
    ) -> Self {
        let mut view = Self::from(recorded);
        for item in &mut view.items {
            item.product_name = product_names.get(&item.product_id).cloned();
        }
        view
    }
}

impl From<&PurchaseWithItems> for PurchaseView {
    fn from(recorded: &PurchaseWithItems) -> Self {
        let purchase = &recorded.purchase;
        Self {
            id: purchase.id,
            purchase_date: timestamp(purchase.purchase_date),
            purchase_location: purchase.purchase_location.clone(),
            user_id: purchase.user_id,
            items: recorded.items.iter().map(PurchaseItemView::from).collect(),
            total: display_precision(purchase.total),
            created_at: timestamp(purchase.created_at),
            updated_at: timestamp(purchase.updated_at),
        }
    }
}

/// Price history entry as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryView {
    /// Entry id
    pub id: i64,
    /// Product the price was paid for
    pub product_id: i64,
    /// User who paid it
    pub user_id: i64,
    /// RFC3339 purchase time
    pub purchase_date: String,
    /// Where it was paid
    pub purchase_place: String,
    /// Unit price paid, 2 decimals
    pub price_paid: f64,
    /// RFC3339 creation time
    pub created_at: String,
    /// RFC3339 time of the last change
    pub updated_at: String,
}

impl From<&price_history::Model> for PriceHistoryView {
    fn from(entry: &price_history::Model) -> Self {
        Self {
            id: entry.id,
            product_id: entry.product_id,
            user_id: entry.user_id,
            purchase_date: timestamp(entry.purchase_date),
            purchase_place: entry.purchase_place.clone(),
            price_paid: display_precision(entry.price_paid),
            created_at: timestamp(entry.created_at),
            updated_at: timestamp(entry.updated_at),
        }
    }
}

/// Price statistics of one product
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceReportView {
    /// Reported product
    pub product_id: i64,
    /// Product name
    pub product_name: String,
    /// Weighted running average kept on the product
    pub current_avg_price: f64,
    /// Plain mean of every recorded price
    pub history_avg_price: f64,
    /// Lowest recorded price
    pub lowest_price: f64,
    /// Highest recorded price
    pub highest_price: f64,
    /// `(highest - lowest) / lowest` as a percentage
    pub price_variation: f64,
    /// Number of price history entries
    pub records_count: u64,
    /// RFC3339 time of the oldest entry
    pub first_record_date: Option<String>,
    /// RFC3339 time of the newest entry
    pub last_record_date: Option<String>,
}

impl From<&PriceReport> for PriceReportView {
    fn from(report: &PriceReport) -> Self {
        Self {
            product_id: report.product.id,
            product_name: report.product.name.clone(),
            current_avg_price: display_precision(report.ledger_average_price),
            history_avg_price: display_precision(report.history_average_price),
            lowest_price: display_precision(report.lowest_price),
            highest_price: display_precision(report.highest_price),
            price_variation: display_precision(report.price_variation_percent),
            records_count: report.records_count,
            first_record_date: report.first_record_date.map(timestamp),
            last_record_date: report.last_record_date.map(timestamp),
        }
    }
}

/// Account as shown to clients; the password hash never leaves the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    /// User id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Role name
    pub role: String,
    /// RFC3339 registration time
    pub created_at: String,
}

impl From<&user::Model> for UserView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            created_at: timestamp(user.created_at),
        }
    }
}

/// Category as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    /// Category id
    pub id: i64,
    /// Category name
    pub name: String,
    /// Owning user
    pub user_id: i64,
    /// RFC3339 creation time
    pub created_at: String,
    /// RFC3339 time of the last change
    pub updated_at: String,
}

impl From<&category::Model> for CategoryView {
    fn from(category: &category::Model) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            user_id: category.user_id,
            created_at: timestamp(category.created_at),
            updated_at: timestamp(category.updated_at),
        }
    }
}

/// Category link as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryLinkView {
    /// Link id
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Linked category
    pub category_id: i64,
    /// Linked product
    pub product_id: i64,
    /// RFC3339 creation time
    pub created_at: String,
    /// RFC3339 time of the last change
    pub updated_at: String,
}

impl From<&user_category_product::Model> for CategoryLinkView {
    fn from(link: &user_category_product::Model) -> Self {
        Self {
            id: link.id,
            user_id: link.user_id,
            category_id: link.category_id,
            product_id: link.product_id,
            created_at: timestamp(link.created_at),
            updated_at: timestamp(link.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::purchase;
    use chrono::TimeZone;
    use serde_json::json;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
    }

    fn sample_purchase() -> PurchaseWithItems {
        PurchaseWithItems {
            purchase: purchase::Model {
                id: 7,
                purchase_date: noon(),
                purchase_location: "Market A".to_string(),
                user_id: 3,
                total: 12.3456,
                is_deleted: false,
                deleted_at: None,
                created_at: noon(),
                updated_at: noon(),
            },
            items: vec![purchase_item::Model {
                id: 11,
                purchase_id: 7,
                product_id: 2,
                quantity: 1.5,
                unit_price: 8.2304,
                total_price: 12.3456,
                average_before: Some(0.0),
                average_after: Some(8.2304),
                is_deleted: false,
                deleted_at: None,
                created_at: noon(),
                updated_at: noon(),
            }],
        }
    }

    #[test]
    fn test_purchase_view_json() {
        let view = PurchaseView::from(&sample_purchase());
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["purchaseDate"], json!("2024-03-09T12:00:00Z"));
        assert_eq!(value["purchaseLocation"], json!("Market A"));
        assert_eq!(value["total"], json!(12.35));
        assert_eq!(value["items"][0]["unitPrice"], json!(8.23));
        assert_eq!(value["items"][0]["totalPrice"], json!(12.35));
        assert!(value["items"][0].get("productName").is_none());
    }

    #[test]
    fn test_purchase_view_with_product_names() {
        let names = HashMap::from([(2, "Milk".to_string())]);
        let view = PurchaseView::with_product_names(&sample_purchase(), &names);
        assert_eq!(view.items[0].product_name.as_deref(), Some("Milk"));
    }

    #[test]
    fn test_product_view_json() {
        let product = product::Model {
            id: 2,
            name: "Milk".to_string(),
            barcode: None,
            average_price: 4.999_96,
            is_deleted: false,
            deleted_at: None,
            created_at: noon(),
            updated_at: noon(),
        };
        let value = serde_json::to_value(ProductView::from(&product)).unwrap();
        assert_eq!(value["averagePrice"], json!(5.0));
        assert_eq!(value["barcode"], json!(null));
        assert_eq!(value["createdAt"], json!("2024-03-09T12:00:00Z"));
    }

    #[test]
    fn test_user_view_omits_password_hash() {
        let user = user::Model {
            id: 1,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "secret".to_string(),
            role: "Standard".to_string(),
            is_deleted: false,
            deleted_at: None,
            created_at: noon(),
            updated_at: noon(),
        };
        let rendered = serde_json::to_string(&UserView::from(&user)).unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("\"email\":\"ana@example.com\""));
    }
}
