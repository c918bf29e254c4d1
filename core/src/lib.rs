//! # Evently Core
//!
//! Core traits and types shared by every Evently crate.
//!
//! The application keeps no state of its own: events, attendance, comments,
//! tickets and user profiles live in an external document database, photos
//! live in blob storage, and credentials are checked by an identity provider.
//! This crate defines those collaborators as traits so the domain services in
//! `ticketing` can be wired to production adapters (`evently-postgres`) or to
//! the in-memory doubles in `evently-testing`.
//!
//! ## Modules
//!
//! - [`document`]: collection paths, document ids, fields, filters, patches
//! - [`document_store`]: the [`DocumentStore`](document_store::DocumentStore)
//!   trait and atomic [`WriteBatch`](document_store::WriteBatch)es
//! - [`blob_store`]: upload bytes, get back a public URL
//! - [`identity`]: email/password registration and sign-in
//! - [`environment`]: injected clock
//!
//! ## Example
//!
//! ```ignore
//! use evently_core::document::{CollectionPath, DocumentId, Patch};
//! use evently_core::document_store::{DocumentStore, DocumentStoreError};
//!
//! async fn rename<S: DocumentStore>(store: &S, id: DocumentId) -> Result<(), DocumentStoreError> {
//!     store
//!         .update(CollectionPath::new("events"), id, Patch::new().set("title", "RustConf"))
//!         .await
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde_json::Value;

pub mod blob_store;
pub mod document;
pub mod document_store;
pub mod identity;

/// Environment module - injected dependencies that are not stores
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use evently_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use document::{CollectionPath, Document, DocumentId, Fields};
pub use document_store::{DocumentStore, DocumentStoreError, WriteBatch};
