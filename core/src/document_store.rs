//! Document store trait and related types.
//!
//! This module defines the abstraction over the hosted document database the
//! application persists into: named collections of JSON documents keyed by
//! opaque string identifiers.
//!
//! # Design
//!
//! The `DocumentStore` trait is deliberately small. Implementors provide three
//! primitives:
//!
//! - [`get`](DocumentStore::get) one document
//! - [`query`](DocumentStore::query) a collection with filters
//! - [`commit`](DocumentStore::commit) a [`WriteBatch`] atomically
//!
//! Every single-document write (`create`, `set`, `update`, `upsert`,
//! `delete`) is a one-write batch, so atomicity and precondition semantics live
//! in exactly one place per backend. The semantics of each write against the
//! current document are defined by [`Write::apply`], shared by all backends.
//!
//! # Implementations
//!
//! - `PostgresDocumentStore` (in `evently-postgres`): JSONB rows, one
//!   transaction per batch with row locks
//! - `InMemoryDocumentStore` (in `evently-testing`): `HashMap` behind a lock,
//!   fast and deterministic for tests
//!
//! # Example
//!
//! ```ignore
//! use evently_core::document::{CollectionPath, DocumentId, Patch, Precondition};
//! use evently_core::document_store::{DocumentStore, WriteBatch};
//!
//! async fn take_seat<S: DocumentStore>(store: &S, event: DocumentId) -> Result<(), DocumentStoreError> {
//!     let mut batch = WriteBatch::new();
//!     batch.update_if(
//!         CollectionPath::new("events"),
//!         event,
//!         Precondition::field_greater_than("capacity", 0),
//!         Patch::new().increment("capacity", -1),
//!     );
//!     store.commit(batch).await
//! }
//! ```

use crate::document::{CollectionPath, Document, DocumentId, Fields, Patch, Precondition, Query};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`DocumentStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DocumentStoreError>> + Send + 'a>>;

/// Errors that can occur during document store operations.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The addressed document does not exist.
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        /// Collection searched
        collection: CollectionPath,
        /// Missing document
        id: DocumentId,
    },

    /// A create targeted an identifier that is already taken.
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists {
        /// Collection written
        collection: CollectionPath,
        /// Conflicting document
        id: DocumentId,
    },

    /// A conditional write found the document in the wrong state.
    ///
    /// The whole batch containing the write was discarded.
    #[error("Precondition failed on {collection}/{id}: expected {precondition}")]
    PreconditionFailed {
        /// Collection written
        collection: CollectionPath,
        /// Document checked
        id: DocumentId,
        /// The condition that did not hold
        precondition: Precondition,
    },

    /// A patch operation did not fit the stored value.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

// ============================================================================
// Writes
// ============================================================================

/// A single write inside a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    /// Create a document; fails with `AlreadyExists` if the id is taken.
    Create {
        /// Target collection
        collection: CollectionPath,
        /// New document id
        id: DocumentId,
        /// Initial fields
        fields: Fields,
    },
    /// Create or replace a document.
    Set {
        /// Target collection
        collection: CollectionPath,
        /// Document id
        id: DocumentId,
        /// Full replacement fields
        fields: Fields,
    },
    /// Partially update an existing document; fails with `NotFound` if absent.
    Update {
        /// Target collection
        collection: CollectionPath,
        /// Document id
        id: DocumentId,
        /// Field operations
        patch: Patch,
        /// Optional condition checked before the patch applies
        precondition: Option<Precondition>,
    },
    /// Partially update a document, starting from an empty one if absent.
    Upsert {
        /// Target collection
        collection: CollectionPath,
        /// Document id
        id: DocumentId,
        /// Field operations
        patch: Patch,
    },
    /// Delete a document; deleting a missing document is not an error.
    Delete {
        /// Target collection
        collection: CollectionPath,
        /// Document id
        id: DocumentId,
    },
}

impl Write {
    /// Collection this write targets.
    #[must_use]
    pub const fn collection(&self) -> &CollectionPath {
        match self {
            Self::Create { collection, .. }
            | Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Upsert { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    /// Document this write targets.
    #[must_use]
    pub const fn id(&self) -> &DocumentId {
        match self {
            Self::Create { id, .. }
            | Self::Set { id, .. }
            | Self::Update { id, .. }
            | Self::Upsert { id, .. }
            | Self::Delete { id, .. } => id,
        }
    }

    /// Compute the document that results from applying this write.
    ///
    /// `current` is the stored document (`None` if absent). Returns the new
    /// fields, or `None` if the document is deleted.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists`: `Create` over an existing document
    /// - `NotFound`: `Update` of a missing document
    /// - `PreconditionFailed`: `Update` whose precondition does not hold
    /// - `InvalidUpdate`: a patch operation does not fit the stored value
    pub fn apply(&self, current: Option<Fields>) -> Result<Option<Fields>, DocumentStoreError> {
        match self {
            Self::Create {
                collection,
                id,
                fields,
            } => {
                if current.is_some() {
                    return Err(DocumentStoreError::AlreadyExists {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                }
                Ok(Some(fields.clone()))
            }
            Self::Set { fields, .. } => Ok(Some(fields.clone())),
            Self::Update {
                collection,
                id,
                patch,
                precondition,
            } => {
                let Some(mut fields) = current else {
                    return Err(DocumentStoreError::NotFound {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                };
                if let Some(precondition) = precondition {
                    if !precondition.holds(Some(&fields)) {
                        return Err(DocumentStoreError::PreconditionFailed {
                            collection: collection.clone(),
                            id: id.clone(),
                            precondition: precondition.clone(),
                        });
                    }
                }
                patch.apply(&mut fields)?;
                Ok(Some(fields))
            }
            Self::Upsert { patch, .. } => {
                let mut fields = current.unwrap_or_default();
                patch.apply(&mut fields)?;
                Ok(Some(fields))
            }
            Self::Delete { .. } => Ok(None),
        }
    }
}

/// Writes committed together: either all apply or none do.
///
/// Writes apply in insertion order, so a later write in the batch sees the
/// result of an earlier write to the same document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    /// Empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// Queue a create with a freshly generated id, returning that id.
    pub fn create(&mut self, collection: CollectionPath, fields: Fields) -> DocumentId {
        let id = DocumentId::generate();
        self.writes.push(Write::Create {
            collection,
            id: id.clone(),
            fields,
        });
        id
    }

    /// Queue a create-or-replace.
    pub fn set(&mut self, collection: CollectionPath, id: DocumentId, fields: Fields) -> &mut Self {
        self.writes.push(Write::Set {
            collection,
            id,
            fields,
        });
        self
    }

    /// Queue a partial update of an existing document.
    pub fn update(&mut self, collection: CollectionPath, id: DocumentId, patch: Patch) -> &mut Self {
        self.writes.push(Write::Update {
            collection,
            id,
            patch,
            precondition: None,
        });
        self
    }

    /// Queue a partial update that only applies when `precondition` holds.
    pub fn update_if(
        &mut self,
        collection: CollectionPath,
        id: DocumentId,
        precondition: Precondition,
        patch: Patch,
    ) -> &mut Self {
        self.writes.push(Write::Update {
            collection,
            id,
            patch,
            precondition: Some(precondition),
        });
        self
    }

    /// Queue a partial update that creates the document if absent.
    pub fn upsert(&mut self, collection: CollectionPath, id: DocumentId, patch: Patch) -> &mut Self {
        self.writes.push(Write::Upsert {
            collection,
            id,
            patch,
        });
        self
    }

    /// Queue a delete.
    pub fn delete(&mut self, collection: CollectionPath, id: DocumentId) -> &mut Self {
        self.writes.push(Write::Delete { collection, id });
        self
    }

    /// The queued writes, in application order.
    #[must_use]
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Consume the batch, returning its writes.
    #[must_use]
    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    /// Number of queued writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Document store abstraction over named collections.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so services can share them behind an
/// `Arc<dyn DocumentStore>` across tasks.
///
/// # Dyn Compatibility
///
/// Methods return [`StoreFuture`] (`Pin<Box<dyn Future>>`) instead of using
/// `async fn` so the trait can be used as a trait object.
pub trait DocumentStore: Send + Sync {
    /// Load one document, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: backend failure
    fn get(&self, collection: CollectionPath, id: DocumentId) -> StoreFuture<'_, Option<Document>>;

    /// Load every document of `collection` matching `query`.
    ///
    /// Result order is unspecified; callers sort what they display.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: backend failure
    fn query(&self, collection: CollectionPath, query: Query) -> StoreFuture<'_, Vec<Document>>;

    /// Apply every write of `batch` atomically.
    ///
    /// If any write fails (see [`Write::apply`]) nothing is persisted and the
    /// first error is returned.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `AlreadyExists`, `PreconditionFailed`, `InvalidUpdate`:
    ///   a write did not apply
    /// - `DatabaseError`: backend failure
    fn commit(&self, batch: WriteBatch) -> StoreFuture<'_, ()>;

    /// Create a document with a store-assigned id.
    ///
    /// # Errors
    ///
    /// See [`commit`](Self::commit).
    fn create(&self, collection: CollectionPath, fields: Fields) -> StoreFuture<'_, DocumentId> {
        let mut batch = WriteBatch::new();
        let id = batch.create(collection, fields);
        let commit = self.commit(batch);
        Box::pin(async move {
            commit.await?;
            Ok(id)
        })
    }

    /// Create or replace a document.
    ///
    /// # Errors
    ///
    /// See [`commit`](Self::commit).
    fn set(&self, collection: CollectionPath, id: DocumentId, fields: Fields) -> StoreFuture<'_, ()> {
        let mut batch = WriteBatch::new();
        batch.set(collection, id, fields);
        self.commit(batch)
    }

    /// Partially update an existing document.
    ///
    /// # Errors
    ///
    /// `NotFound` if the document does not exist; see [`commit`](Self::commit).
    fn update(&self, collection: CollectionPath, id: DocumentId, patch: Patch) -> StoreFuture<'_, ()> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, patch);
        self.commit(batch)
    }

    /// Partially update a document, creating it if absent.
    ///
    /// # Errors
    ///
    /// See [`commit`](Self::commit).
    fn upsert(&self, collection: CollectionPath, id: DocumentId, patch: Patch) -> StoreFuture<'_, ()> {
        let mut batch = WriteBatch::new();
        batch.upsert(collection, id, patch);
        self.commit(batch)
    }

    /// Delete a document (no error if it is already gone).
    ///
    /// # Errors
    ///
    /// See [`commit`](Self::commit).
    fn delete(&self, collection: CollectionPath, id: DocumentId) -> StoreFuture<'_, ()> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch)
    }
}
