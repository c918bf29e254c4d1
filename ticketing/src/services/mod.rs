//! Ticketing services.
//!
//! Each service owns one slice of the domain and talks to the external
//! collaborators through `Arc<dyn Trait>` handles:
//!
//! - [`EventCatalog`]: create, read, search, edit and delete events
//! - [`AttendanceLedger`]: join and leave events
//! - [`CommentThreads`]: comments and replies per event
//! - [`TicketOffice`]: capacity-checked ticket issuance and purchase
//! - [`Accounts`]: registration, sign-in, sessions and profiles
//!
//! Every operation is a single request against the document store (ticket
//! issuance is one atomic batch). Nothing retries or caches.

mod accounts;
mod attendance;
mod comments;
mod events;
mod tickets;

pub use accounts::Accounts;
pub use attendance::AttendanceLedger;
pub use comments::CommentThreads;
pub use events::EventCatalog;
pub use tickets::{MISSING_EVENT_TITLE, TicketOffice};

use crate::collections;
use crate::error::{Result, TicketingError};
use crate::types::{Event, EventId};
use evently_core::blob_store::{BlobKey, BlobStore};
use evently_core::document_store::DocumentStore;
use evently_core::environment::Clock;

/// An uploaded image (event photo or avatar).
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    /// Original file name
    pub file_name: String,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Creates a new `PhotoUpload`
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Upload under a `{epoch_millis}_{file_name}` key and return the public URL.
async fn upload_photo(blobs: &dyn BlobStore, clock: &dyn Clock, photo: PhotoUpload) -> Result<String> {
    if photo.file_name.trim().is_empty() {
        return Err(TicketingError::Validation("photo file name is required".to_string()));
    }
    let key = BlobKey::timestamped(clock.now(), &photo.file_name);
    let url = blobs
        .upload(key.clone(), photo.bytes, photo.content_type)
        .await
        .inspect_err(|e| tracing::error!(key = %key, error = %e, "Photo upload failed"))?;
    tracing::debug!(key = %key, url = %url, "Photo uploaded");
    Ok(url)
}

/// Load an event or fail with `NotFound`.
async fn load_event(store: &dyn DocumentStore, id: &EventId) -> Result<Event> {
    let document = store
        .get(collections::events(), id.document_id())
        .await?
        .ok_or_else(|| TicketingError::event_not_found(id))?;
    Ok(Event::from_document(&document)?)
}
