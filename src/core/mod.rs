//! Core business logic - framework-agnostic ledger, purchase and pricing operations.

/// Roles, request identity and the owner-or-admin rule
pub mod access;
/// Background job queue
pub mod background;
/// Per-user product categories
pub mod category;
/// Storage and display rounding
pub mod decimal;
/// Per-key async locks
pub mod locks;
/// Append-only price observations
pub mod price_history;
/// Product catalogue and running average price
pub mod product;
/// Purchase recording and reconciliation
pub mod purchase;
/// Price reports
pub mod report;
/// User accounts
pub mod user;
/// Links filing products under user categories
pub mod user_category_product;
/// Client-facing renderings
pub mod views;
