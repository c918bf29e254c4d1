//! Attendance ledger: which events each user attends.

use super::load_event;
use crate::collections;
use crate::error::Result;
use crate::metrics;
use crate::session::Session;
use crate::types::{AttendanceRecord, Event, EventId, UserId};
use evently_core::document::Patch;
use evently_core::document_store::DocumentStore;
use serde_json::Value;
use std::sync::Arc;

/// Join and leave events.
///
/// Each user's record (`userRoles/{userId}`) holds the set of attended
/// event ids. Joins and leaves are set union and set difference applied by
/// the store, so both are idempotent and a first join needs no read.
#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn DocumentStore>,
}

impl AttendanceLedger {
    /// Creates a new `AttendanceLedger`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Add `event_id` to the session user's attended events.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the event does not exist
    /// - `Store`: the write failed
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn join_event(&self, session: &Session, event_id: &EventId) -> Result<()> {
        load_event(self.store.as_ref(), event_id).await?;
        self.store
            .upsert(
                collections::user_roles(),
                session.user_id.document_id(),
                Patch::new().array_union("attendingEvents", vec![Value::from(event_id.as_str())]),
            )
            .await?;

        metrics::record_attendance_change("join");
        tracing::info!(event_id = %event_id, "Joined event");
        Ok(())
    }

    /// Remove `event_id` from the session user's attended events.
    ///
    /// Works for events that no longer exist.
    ///
    /// # Errors
    ///
    /// `Store` if the write failed.
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn leave_event(&self, session: &Session, event_id: &EventId) -> Result<()> {
        self.store
            .upsert(
                collections::user_roles(),
                session.user_id.document_id(),
                Patch::new().array_remove("attendingEvents", vec![Value::from(event_id.as_str())]),
            )
            .await?;

        metrics::record_attendance_change("leave");
        tracing::info!(event_id = %event_id, "Left event");
        Ok(())
    }

    /// The user's attendance record (empty if they never joined anything).
    ///
    /// # Errors
    ///
    /// `Store` on backend failure or an undecodable record.
    pub async fn attendance(&self, user_id: &UserId) -> Result<AttendanceRecord> {
        let document = self
            .store
            .get(collections::user_roles(), user_id.document_id())
            .await?;
        match document {
            Some(document) => Ok(document.decode()?),
            None => Ok(AttendanceRecord::default()),
        }
    }

    /// Check if the user attends the event
    ///
    /// # Errors
    ///
    /// See [`attendance`](Self::attendance).
    pub async fn is_attending(&self, user_id: &UserId, event_id: &EventId) -> Result<bool> {
        Ok(self
            .attendance(user_id)
            .await?
            .attending_events
            .contains(event_id))
    }

    /// Events the user attends, skipping events that have been deleted.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    pub async fn attending_events(&self, user_id: &UserId) -> Result<Vec<Event>> {
        let record = self.attendance(user_id).await?;
        let mut events = Vec::with_capacity(record.attending_events.len());
        for event_id in &record.attending_events {
            match self.store.get(collections::events(), event_id.document_id()).await? {
                Some(document) => events.push(Event::from_document(&document)?),
                None => tracing::debug!(event_id = %event_id, "Skipping deleted event"),
            }
        }
        Ok(events)
    }
}
