//! Application state - everything a request handler needs, wired once at startup.

use crate::{
    config::AppConfig,
    core::{
        background::{BackgroundQueue, Job},
        purchase::PurchaseReconciler,
        user::{NewUser, create_user},
    },
    entities::user,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::warn;

/// Shared state available to every request.
/// Holds the database connection, the purchase reconciler and the background queue.
#[derive(Debug)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<AppConfig>,
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Purchase creation and deletion
    pub purchases: PurchaseReconciler,
    background: BackgroundQueue,
}

impl AppState {
    /// Wires the services and starts the background worker.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(config: AppConfig, database: DatabaseConnection) -> Self {
        let background = BackgroundQueue::start(
            database.clone(),
            config.default_categories.clone(),
            config.background_queue_capacity,
        );

        Self {
            config: Arc::new(config),
            purchases: PurchaseReconciler::new(database.clone()),
            database,
            background,
        }
    }

    /// Registers a user and queues the seeding of their default categories.
    ///
    /// Seeding happens in the background; registration succeeds even if it is dropped.
    pub async fn register_user(&self, new: NewUser) -> Result<user::Model> {
        let user = create_user(&self.database, new).await?;
        if !self.background.enqueue(Job::SeedDefaultCategories { user_id: user.id }) {
            warn!("Default categories for user {} will not be created", user.id);
        }
        Ok(user)
    }

    /// Waits for queued background work, then releases the state.
    pub async fn shutdown(self) {
        self.background.shutdown().await;
    }
}
