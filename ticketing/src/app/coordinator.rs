//! Application coordinator - builds the services over shared collaborators.

use crate::config::{Config, StoreBackend};
use crate::payment::{MockPaymentProcessor, PaymentProcessor};
use crate::services::{Accounts, AttendanceLedger, CommentThreads, EventCatalog, TicketOffice};
use evently_core::blob_store::BlobStore;
use evently_core::document_store::{DocumentStore, DocumentStoreError};
use evently_core::environment::{Clock, SystemClock};
use evently_core::identity::IdentityProvider;
use evently_postgres::PostgresDocumentStore;
use evently_testing::{InMemoryBlobStore, InMemoryDocumentStore, InMemoryIdentityProvider};
use std::sync::Arc;
use thiserror::Error;

/// Application errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Store connection or migration failed
    #[error("Store error: {0}")]
    Store(#[from] DocumentStoreError),
}

/// Main ticketing application.
///
/// Every service shares the same collaborators:
/// - Document store (in-memory or `PostgreSQL`)
/// - Blob store (uploaded photos)
/// - Identity provider (accounts)
/// - Payment processor (card tokenization)
/// - Clock
#[derive(Clone)]
pub struct TicketingApp {
    /// Event lifecycle and search
    pub events: EventCatalog,
    /// Join/leave
    pub attendance: AttendanceLedger,
    /// Comment threads
    pub comments: CommentThreads,
    /// Ticket issuance
    pub tickets: TicketOffice,
    /// Registration, sign-in, profiles
    pub accounts: Accounts,
    /// Configuration
    config: Config,
}

impl TicketingApp {
    /// Build the application over explicit collaborators.
    #[must_use]
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        identity: Arc<dyn IdentityProvider>,
        payments: Arc<dyn PaymentProcessor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events: EventCatalog::new(store.clone(), blobs.clone(), clock.clone()),
            attendance: AttendanceLedger::new(store.clone()),
            comments: CommentThreads::new(store.clone(), clock.clone(), config.app.anonymous_name.clone()),
            tickets: TicketOffice::new(store.clone(), payments),
            accounts: Accounts::new(
                store,
                identity,
                blobs,
                clock,
                config.blobs.default_avatar_url.clone(),
            ),
            config,
        }
    }

    /// Build the application over in-process collaborators.
    ///
    /// Uses the in-memory document store regardless of `config.store`.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        Self::with_local_services(config, store)
    }

    /// Build the application for the configured store backend.
    ///
    /// The `PostgreSQL` backend is connected and migrated before the services
    /// are built. Blobs, identity and payments always use the in-process
    /// implementations, so sign-in accounts and uploaded photos live only as
    /// long as the process. With `PostgreSQL` the `users` profiles outlive
    /// them: after a restart a profile exists but its account must be
    /// registered again before it can sign in.
    ///
    /// # Errors
    ///
    /// Returns error if the database connection or migration fails.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        tracing::info!(backend = %config.store.backend, "Initializing Evently...");

        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(InMemoryDocumentStore::new()),
            StoreBackend::Postgres => {
                let store = PostgresDocumentStore::connect(
                    &config.store.database_url,
                    config.store.max_connections,
                    config.store.connect_timeout(),
                )
                .await?;

                tracing::info!("Running database migrations...");
                store.migrate().await?;
                Arc::new(store)
            }
        };
        tracing::info!("✓ Document store ready");

        Ok(Self::with_local_services(config, store))
    }

    fn with_local_services(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let blobs = Arc::new(InMemoryBlobStore::new(config.blobs.public_base_url.clone()));
        Self::new(
            config,
            store,
            blobs,
            Arc::new(InMemoryIdentityProvider::new()),
            MockPaymentProcessor::shared(),
            Arc::new(SystemClock),
        )
    }

    /// Get the application configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}
