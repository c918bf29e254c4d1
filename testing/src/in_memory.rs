//! In-memory collaborators for fast, deterministic tests
//!
//! - [`InMemoryDocumentStore`]: `HashMap`-based document storage with atomic
//!   batches
//! - [`InMemoryBlobStore`]: records uploads, answers with predictable URLs
//! - [`InMemoryIdentityProvider`]: email/password accounts kept in memory

use evently_core::blob_store::{BlobKey, BlobStore, BlobStoreError};
use evently_core::document::{CollectionPath, Document, DocumentId, Fields, Query};
use evently_core::document_store::{DocumentStore, DocumentStoreError, StoreFuture, WriteBatch};
use evently_core::identity::{AuthUser, Credentials, IdentityError, IdentityProvider, MIN_PASSWORD_LEN};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type Collections = HashMap<CollectionPath, BTreeMap<DocumentId, Fields>>;

// ============================================================================
// Document store
// ============================================================================

/// In-memory document store for fast, deterministic testing.
///
/// A batch is applied under a single write lock: every write is first
/// evaluated against a staged view, and only if all succeed are the results
/// copied into the collections. Clones share the same data.
///
/// # Example
///
/// ```
/// use evently_core::document::{CollectionPath, Filter, Query};
/// use evently_core::document_store::DocumentStore;
/// use evently_testing::InMemoryDocumentStore;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryDocumentStore::new();
/// let events = CollectionPath::new("events");
/// let fields = json!({ "tags": ["rust"] }).as_object().cloned().unwrap_or_default();
/// store.create(events.clone(), fields).await.unwrap();
///
/// let found = store
///     .query(events, Query::new().filter(Filter::array_contains("tags", "rust")))
///     .await
///     .unwrap();
/// assert_eq!(found.len(), 1);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryDocumentStore {
    data: Arc<RwLock<Collections>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory document store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `commit` fail with `DatabaseError`.
    ///
    /// Reads keep working. Used to exercise infrastructure-failure paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Clear all documents (for test isolation)
    pub fn clear(&self) {
        self.data.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of documents in `collection`.
    #[must_use]
    pub fn count(&self, collection: &CollectionPath) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Total number of documents across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).values().map(BTreeMap::len).sum()
    }

    /// Check if the store holds no documents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read a document synchronously, for assertions.
    #[must_use]
    pub fn document(&self, collection: &CollectionPath, id: &DocumentId) -> Option<Fields> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Store a document directly, bypassing batch semantics. For seeding.
    pub fn insert(&self, collection: CollectionPath, id: DocumentId, fields: Fields) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection)
            .or_default()
            .insert(id, fields);
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), DocumentStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::DatabaseError(
                "writes disabled for this test".to_string(),
            ));
        }

        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let mut staged: HashMap<(CollectionPath, DocumentId), Option<Fields>> = HashMap::new();

        for write in batch.writes() {
            let key = (write.collection().clone(), write.id().clone());
            let current = match staged.get(&key) {
                Some(pending) => pending.clone(),
                None => data
                    .get(write.collection())
                    .and_then(|docs| docs.get(write.id()))
                    .cloned(),
            };
            let next = write.apply(current)?;
            staged.insert(key, next);
        }

        tracing::debug!(writes = batch.len(), documents = staged.len(), "Committed batch");

        for ((collection, id), fields) in staged {
            match fields {
                Some(fields) => {
                    data.entry(collection).or_default().insert(id, fields);
                }
                None => {
                    if let Some(docs) = data.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, collection: CollectionPath, id: DocumentId) -> StoreFuture<'_, Option<Document>> {
        let found = self
            .document(&collection, &id)
            .map(|fields| Document::new(id, fields));
        Box::pin(async move { Ok(found) })
    }

    fn query(&self, collection: CollectionPath, query: Query) -> StoreFuture<'_, Vec<Document>> {
        let found: Vec<Document> = self
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| query.matches(fields))
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Box::pin(async move { Ok(found) })
    }

    fn commit(&self, batch: WriteBatch) -> StoreFuture<'_, ()> {
        let result = self.apply_batch(batch);
        Box::pin(async move { result })
    }
}

// ============================================================================
// Blob store
// ============================================================================

/// A blob recorded by [`InMemoryBlobStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Uploaded bytes
    pub bytes: Vec<u8>,
    /// Declared content type
    pub content_type: String,
}

/// In-memory blob store answering with `{base_url}/{key}`.
#[derive(Clone, Debug)]
pub struct InMemoryBlobStore {
    base_url: String,
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
    fail_uploads: Arc<AtomicBool>,
}

impl InMemoryBlobStore {
    /// Create a store whose URLs start with `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: Arc::new(RwLock::new(HashMap::new())),
            fail_uploads: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Blob stored under `key`, if any.
    #[must_use]
    pub fn blob(&self, key: &str) -> Option<StoredBlob> {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    /// Keys of every stored blob, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://blobs")
    }
}

impl BlobStore for InMemoryBlobStore {
    fn upload(
        &self,
        key: BlobKey,
        bytes: Vec<u8>,
        content_type: String,
    ) -> Pin<Box<dyn Future<Output = Result<String, BlobStoreError>> + Send + '_>> {
        let result = if self.fail_uploads.load(Ordering::SeqCst) {
            Err(BlobStoreError::UploadFailed(format!("upload of {key} rejected")))
        } else {
            self.blobs.write().unwrap_or_else(PoisonError::into_inner).insert(
                key.as_str().to_string(),
                StoredBlob {
                    bytes,
                    content_type,
                },
            );
            Ok(format!("{}/{key}", self.base_url))
        };
        Box::pin(async move { result })
    }
}

// ============================================================================
// Identity provider
// ============================================================================

#[derive(Clone, Debug)]
struct Account {
    uid: String,
    email: String,
    password: String,
}

/// In-memory identity provider.
///
/// Emails are matched case-insensitively. Registration enforces the same
/// rules as the hosted provider: a plausible email and a password of at least
/// [`MIN_PASSWORD_LEN`] characters.
#[derive(Clone, Debug, Default)]
pub struct InMemoryIdentityProvider {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryIdentityProvider {
    /// Create a provider with no accounts
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if no account is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register_now(&self, credentials: Credentials) -> Result<AuthUser, IdentityError> {
        let email = credentials.email.trim().to_string();
        if !is_plausible_email(&email) {
            return Err(IdentityError::InvalidEmail(email));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }

        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        let key = email.to_lowercase();
        if accounts.contains_key(&key) {
            return Err(IdentityError::EmailInUse(email));
        }

        let account = Account {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email,
            password: credentials.password,
        };
        let user = AuthUser {
            uid: account.uid.clone(),
            email: account.email.clone(),
        };
        accounts.insert(key, account);
        Ok(user)
    }

    fn sign_in_now(&self, credentials: &Credentials) -> Result<AuthUser, IdentityError> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        match accounts.get(&credentials.email.trim().to_lowercase()) {
            Some(account) if account.password == credentials.password => Ok(AuthUser {
                uid: account.uid.clone(),
                email: account.email.clone(),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn register(
        &self,
        credentials: Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<AuthUser, IdentityError>> + Send + '_>> {
        let result = self.register_now(credentials);
        Box::pin(async move { result })
    }

    fn sign_in(
        &self,
        credentials: Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<AuthUser, IdentityError>> + Send + '_>> {
        let result = self.sign_in_now(&credentials);
        Box::pin(async move { result })
    }
}
