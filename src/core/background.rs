//! Background work queue.
//!
//! A bounded channel feeding a single worker task. Enqueueing never blocks and never fails
//! the caller: when the queue is full or closed the job is dropped with a warning. Job
//! failures are logged by the worker. [`BackgroundQueue::shutdown`] closes the channel and
//! waits for the worker to finish what is already queued.

use crate::core::category::seed_default_categories;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Work the queue knows how to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Create the configured default categories for a freshly registered user
    SeedDefaultCategories {
        /// The new user
        user_id: i64,
    },
}

/// Handle to the queue and its worker.
#[derive(Debug)]
pub struct BackgroundQueue {
    sender: mpsc::Sender<Job>,
    worker: JoinHandle<()>,
}

impl BackgroundQueue {
    /// Spawns the worker on the current runtime.
    ///
    /// `default_categories` is what [`Job::SeedDefaultCategories`] creates. A capacity of
    /// zero is raised to one.
    #[must_use]
    pub fn start(db: DatabaseConnection, default_categories: Vec<String>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Job>(capacity.max(1));
        let categories: Arc<[String]> = default_categories.into();

        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                run_job(&db, &categories, job).await;
            }
            debug!("Background queue closed");
        });

        Self { sender, worker }
    }

    /// Queues a job. Returns `false` when it was dropped.
    pub fn enqueue(&self, job: Job) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!("Background queue full, dropping {:?}", job);
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!("Background queue closed, dropping {:?}", job);
                false
            }
        }
    }

    /// Stops accepting jobs and waits until the queued ones have run.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            error!("Background worker stopped abnormally: {}", e);
        }
    }
}

async fn run_job(db: &DatabaseConnection, categories: &[String], job: Job) {
    match job {
        Job::SeedDefaultCategories { user_id } => {
            if let Err(e) = seed_default_categories(db, user_id, categories).await {
                warn!("Seeding categories for user {} failed: {}", user_id, e);
            }
        }
    }
}
