//! Comment threads: per-event comments with appended replies.

use super::load_event;
use crate::collections;
use crate::error::{Result, TicketingError};
use crate::metrics;
use crate::session::Session;
use crate::types::{Comment, CommentBody, CommentId, EventId, Reply};
use evently_core::document::{Patch, Query, to_fields};
use evently_core::document_store::{DocumentStore, DocumentStoreError};
use evently_core::environment::Clock;
use serde_json::Value;
use std::cmp::Reverse;
use std::sync::Arc;

/// Post comments and replies, read whole threads.
///
/// Comments live in `events/{eventId}/comments`. A reply is appended to its
/// comment's `replies` array and never becomes a comment of its own. There
/// is no edit, delete or pagination.
#[derive(Clone)]
pub struct CommentThreads {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    anonymous_name: String,
}

fn content(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TicketingError::Validation("comment text is required".to_string()));
    }
    Ok(text.to_string())
}

impl CommentThreads {
    /// Creates a new `CommentThreads`; `anonymous_name` is the author name
    /// used for sessions with a blank username.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, anonymous_name: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            anonymous_name: anonymous_name.into(),
        }
    }

    /// Post a top-level comment on an event.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank text
    /// - `NotFound`: the event does not exist
    /// - `Store`: the write failed
    #[tracing::instrument(skip(self, session, text), fields(user_id = %session.user_id))]
    pub async fn add_comment(&self, session: &Session, event_id: &EventId, text: &str) -> Result<CommentId> {
        let content = content(text)?;
        load_event(self.store.as_ref(), event_id).await?;

        let body = CommentBody {
            user_id: session.user_id.clone(),
            username: session.display_name(&self.anonymous_name).to_string(),
            content,
            timestamp: self.clock.now(),
            replies: Vec::new(),
        };
        let id = CommentId::from(
            self.store
                .create(collections::comments(event_id), to_fields(&body)?)
                .await?,
        );

        metrics::record_comment("comment");
        tracing::info!(event_id = %event_id, comment_id = %id, "Comment added");
        Ok(id)
    }

    /// Append a reply to a comment.
    ///
    /// # Errors
    ///
    /// - `Validation`: blank text
    /// - `NotFound`: the comment does not exist
    /// - `Store`: the write failed
    #[tracing::instrument(skip(self, session, text), fields(user_id = %session.user_id))]
    pub async fn add_reply(
        &self,
        session: &Session,
        event_id: &EventId,
        comment_id: &CommentId,
        text: &str,
    ) -> Result<()> {
        let reply = Reply {
            user_id: session.user_id.clone(),
            username: session.display_name(&self.anonymous_name).to_string(),
            content: content(text)?,
            timestamp: self.clock.now(),
        };
        let reply = Value::Object(to_fields(&reply)?);

        self.store
            .update(
                collections::comments(event_id),
                comment_id.document_id(),
                Patch::new().array_append("replies", vec![reply]),
            )
            .await
            .map_err(|e| match e {
                DocumentStoreError::NotFound { .. } => TicketingError::NotFound {
                    entity: "comment",
                    id: comment_id.to_string(),
                },
                other => TicketingError::Store(other),
            })?;

        metrics::record_comment("reply");
        tracing::info!(event_id = %event_id, comment_id = %comment_id, "Reply added");
        Ok(())
    }

    /// The whole thread of an event, newest comment first.
    ///
    /// Comments with equal timestamps are ordered by id, descending. Replies
    /// stay in the order they were appended.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure or an undecodable comment.
    pub async fn thread(&self, event_id: &EventId) -> Result<Vec<Comment>> {
        let documents = self
            .store
            .query(collections::comments(event_id), Query::new())
            .await?;
        let mut comments = documents
            .iter()
            .map(Comment::from_document)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        comments.sort_by_key(|comment| Reverse((comment.body.timestamp, comment.id.clone())));
        Ok(comments)
    }
}
