//! Event catalog: the lifecycle of events and their search.

use super::{PhotoUpload, load_event, upload_photo};
use crate::collections;
use crate::error::{Result, TicketingError};
use crate::forms::{EventForm, SearchQuery};
use crate::metrics;
use crate::session::Session;
use crate::types::{Event, EventId, UserId};
use evently_core::blob_store::BlobStore;
use evently_core::document::{Filter, Patch, Precondition, Query, to_fields};
use evently_core::document_store::{DocumentStore, DocumentStoreError, WriteBatch};
use evently_core::environment::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Create, read, search, edit and delete events.
///
/// Only organizers create events, and only the owning organizer edits or
/// deletes one.
#[derive(Clone)]
pub struct EventCatalog {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl EventCatalog {
    /// Creates a new `EventCatalog`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, blobs, clock }
    }

    /// Create an event owned by the session's user.
    ///
    /// The photo, when given, is uploaded before the event is written.
    ///
    /// # Errors
    ///
    /// - `Forbidden`: the session is not an organizer
    /// - `Blob`, `Store`: upload or write failed
    #[tracing::instrument(skip(self, session, form, photo), fields(user_id = %session.user_id))]
    pub async fn create_event(
        &self,
        session: &Session,
        form: EventForm,
        photo: Option<PhotoUpload>,
    ) -> Result<EventId> {
        session
            .require_organizer()
            .inspect_err(|e| tracing::warn!(error = %e, "Event creation refused"))?;

        let photo = match photo {
            Some(photo) => Some(upload_photo(self.blobs.as_ref(), self.clock.as_ref(), photo).await?),
            None => None,
        };
        let details = form.into_details(session.user_id.clone(), photo);
        let id = EventId::from(self.store.create(collections::events(), to_fields(&details)?).await?);

        metrics::record_event_created();
        tracing::info!(event_id = %id, title = %details.title, capacity = %details.capacity, "Event created");
        Ok(id)
    }

    /// Fetch one event.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    pub async fn event(&self, id: &EventId) -> Result<Event> {
        load_event(self.store.as_ref(), id).await
    }

    /// All events, soonest first.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        self.find(Query::new()).await
    }

    /// Events owned by `organizer`, soonest first.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    pub async fn events_by_organizer(&self, organizer: &UserId) -> Result<Vec<Event>> {
        self.find(Query::new().filter(Filter::eq("organizerId", organizer.as_str())))
            .await
    }

    /// Replace an event's details.
    ///
    /// The photo is replaced only when a new one is uploaded. Capacity is set
    /// to the form's value.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the event does not exist
    /// - `Forbidden`: the session does not own the event
    /// - `Blob`, `Store`: upload or write failed
    #[tracing::instrument(skip(self, session, form, photo), fields(user_id = %session.user_id))]
    pub async fn update_event(
        &self,
        session: &Session,
        id: &EventId,
        form: EventForm,
        photo: Option<PhotoUpload>,
    ) -> Result<Event> {
        let existing = load_event(self.store.as_ref(), id).await?;
        session
            .require_owner(&existing)
            .inspect_err(|e| tracing::warn!(error = %e, "Event update refused"))?;

        let photo = match photo {
            Some(photo) => Some(upload_photo(self.blobs.as_ref(), self.clock.as_ref(), photo).await?),
            None => existing.details.photo,
        };
        let details = form.into_details(existing.details.organizer_id, photo);
        let patch = to_fields(&details)?
            .into_iter()
            .fold(Patch::new(), |patch, (field, value)| patch.set(field, value));

        self.store
            .update(collections::events(), id.document_id(), patch)
            .await?;

        tracing::info!(event_id = %id, "Event updated");
        Ok(Event {
            id: id.clone(),
            details,
        })
    }

    /// Delete an event together with its comment thread.
    ///
    /// Issued tickets and attendance records are kept; readers skip events
    /// that no longer exist. The batch only commits while the event still
    /// exists. A comment posted after the thread is read is not deleted.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the event does not exist, or was deleted concurrently
    /// - `Forbidden`: the session does not own the event
    /// - `Store`: the delete failed
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn delete_event(&self, session: &Session, id: &EventId) -> Result<()> {
        let existing = load_event(self.store.as_ref(), id).await?;
        session
            .require_owner(&existing)
            .inspect_err(|e| tracing::warn!(error = %e, "Event deletion refused"))?;

        let thread = collections::comments(id);
        let comments = self.store.query(thread.clone(), Query::new()).await?;

        let mut batch = WriteBatch::new();
        batch.update_if(collections::events(), id.document_id(), Precondition::Exists, Patch::new());
        for comment in &comments {
            batch.delete(thread.clone(), comment.id.clone());
        }
        batch.delete(collections::events(), id.document_id());
        self.store.commit(batch).await.map_err(|e| match e {
            DocumentStoreError::NotFound { .. } | DocumentStoreError::PreconditionFailed { .. } => {
                TicketingError::event_not_found(id)
            }
            other => TicketingError::Store(other),
        })?;

        metrics::record_event_deleted();
        tracing::info!(event_id = %id, comments = comments.len(), "Event deleted");
        Ok(())
    }

    /// Events whose title starts with the query text and/or carrying any of
    /// the query tags, ordered by title.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    pub async fn search(&self, search: &SearchQuery) -> Result<Vec<Event>> {
        let mut query = Query::new();
        if let Some(text) = search.text() {
            query = query.filter(Filter::starts_with("title", text));
        }
        if !search.tags().is_empty() {
            query = query.filter(Filter::array_contains_any("tags", search.tags().to_values()));
        }

        let mut events = self.find(query).await?;
        events.sort_by(|a, b| {
            a.details
                .title
                .cmp(&b.details.title)
                .then_with(|| a.id.cmp(&b.id))
        });
        tracing::debug!(results = events.len(), "Search completed");
        Ok(events)
    }

    /// Union of the tags of every event, for the tag selector.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    pub async fn available_tags(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .list_events()
            .await?
            .into_iter()
            .flat_map(|event| event.details.tags.into_inner())
            .collect())
    }

    async fn find(&self, query: Query) -> Result<Vec<Event>> {
        let documents = self.store.query(collections::events(), query).await?;
        let mut events = documents
            .iter()
            .map(Event::from_document)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        events.sort_by(|a, b| a.details.date.cmp(&b.details.date).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }
}
