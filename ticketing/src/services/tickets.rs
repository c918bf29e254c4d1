//! Ticket office: capacity-checked issuance and card purchases.
//!
//! # Capacity
//!
//! Issuing a ticket commits one batch:
//!
//! ```text
//! update events/{id}   if capacity > 0   capacity -= 1
//! create tickets/{new} { eventId, userId }
//! ```
//!
//! The precondition is checked by the store inside the batch, so concurrent
//! purchases can never drive capacity below zero, and a ticket exists only
//! if its decrement was applied.

use super::load_event;
use crate::collections;
use crate::error::{Result, TicketingError};
use crate::metrics;
use crate::payment::{CardDetails, PaymentProcessor};
use crate::session::Session;
use crate::types::{Event, EventDate, EventId, Ticket, TicketId, TicketReceipt, TicketRecord, UserId};
use evently_core::document::{Filter, Patch, Precondition, Query, to_fields};
use evently_core::document_store::{DocumentStore, DocumentStoreError, WriteBatch};
use std::sync::Arc;

/// Title printed on receipts whose event has been deleted.
pub const MISSING_EVENT_TITLE: &str = "Event no longer available";

/// Issue and look up tickets.
#[derive(Clone)]
pub struct TicketOffice {
    store: Arc<dyn DocumentStore>,
    payments: Arc<dyn PaymentProcessor>,
}

impl TicketOffice {
    /// Creates a new `TicketOffice`
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, payments: Arc<dyn PaymentProcessor>) -> Self {
        Self { store, payments }
    }

    /// Issue a ticket for the session's user, taking one unit of capacity.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the event does not exist
    /// - `CapacityExceeded`: no tickets left, including when a concurrent
    ///   purchase took the last one; no ticket is created
    /// - `Store`: the batch failed
    #[tracing::instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn issue_ticket(&self, session: &Session, event_id: &EventId) -> Result<TicketId> {
        let result = async {
            let event = self.available_event(event_id).await?;
            self.issue(session, &event).await
        }
        .await;
        record_outcome(&result);
        result
    }

    /// Tokenize the card, then issue a ticket.
    ///
    /// Availability is checked before the payment processor is called. A
    /// created payment method is authorization to issue.
    ///
    /// # Errors
    ///
    /// - `NotFound`, `CapacityExceeded`: as for [`issue_ticket`](Self::issue_ticket)
    /// - `Payment`: the processor rejected the card
    /// - `Store`: the batch failed
    #[tracing::instrument(skip(self, session, card), fields(user_id = %session.user_id))]
    pub async fn purchase_ticket(
        &self,
        session: &Session,
        event_id: &EventId,
        card: CardDetails,
    ) -> Result<TicketId> {
        let result = async {
            let event = self.available_event(event_id).await?;

            let method = self
                .payments
                .create_payment_method(card)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Payment method rejected"))?;

            self.issue(session, &event).await.inspect_err(|e| {
                tracing::error!(
                    payment_method_id = %method.id,
                    error = %e,
                    "Ticket issuance failed after payment authorization"
                );
            })
        }
        .await;
        record_outcome(&result);
        result
    }

    /// Fetch one ticket.
    ///
    /// # Errors
    ///
    /// `NotFound` if the ticket does not exist.
    pub async fn ticket(&self, id: &TicketId) -> Result<Ticket> {
        let document = self
            .store
            .get(collections::tickets(), id.document_id())
            .await?
            .ok_or_else(|| TicketingError::NotFound {
                entity: "ticket",
                id: id.to_string(),
            })?;
        Ok(Ticket::from_document(&document)?)
    }

    /// Tickets held by `user_id`.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    pub async fn tickets_for_user(&self, user_id: &UserId) -> Result<Vec<Ticket>> {
        self.find(Filter::eq("userId", user_id.as_str())).await
    }

    /// Tickets issued for `event_id`.
    ///
    /// # Errors
    ///
    /// `Store` on backend failure.
    pub async fn tickets_for_event(&self, event_id: &EventId) -> Result<Vec<Ticket>> {
        self.find(Filter::eq("eventId", event_id.as_str())).await
    }

    /// Plain-text receipt for a ticket.
    ///
    /// A deleted event yields [`MISSING_EVENT_TITLE`] and no date.
    ///
    /// # Errors
    ///
    /// `NotFound` if the ticket does not exist.
    pub async fn receipt(&self, id: &TicketId) -> Result<TicketReceipt> {
        let ticket = self.ticket(id).await?;
        let event = self
            .store
            .get(collections::events(), ticket.record.event_id.document_id())
            .await?
            .map(|document| Event::from_document(&document))
            .transpose()?;

        Ok(match event {
            Some(event) => TicketReceipt {
                ticket_id: ticket.id,
                event_title: event.details.title,
                event_date: Some(EventDate::new(event.details.date)),
            },
            None => TicketReceipt {
                ticket_id: ticket.id,
                event_title: MISSING_EVENT_TITLE.to_string(),
                event_date: None,
            },
        })
    }

    async fn available_event(&self, event_id: &EventId) -> Result<Event> {
        let event = load_event(self.store.as_ref(), event_id).await?;
        if !event.details.capacity.is_available() {
            return Err(TicketingError::CapacityExceeded {
                event_id: event_id.clone(),
            });
        }
        Ok(event)
    }

    async fn issue(&self, session: &Session, event: &Event) -> Result<TicketId> {
        let record = TicketRecord {
            event_id: event.id.clone(),
            user_id: session.user_id.clone(),
        };

        let mut batch = WriteBatch::new();
        batch.update_if(
            collections::events(),
            event.id.document_id(),
            Precondition::field_greater_than("capacity", 0),
            Patch::new().increment("capacity", -1),
        );
        let ticket_id = TicketId::from(batch.create(collections::tickets(), to_fields(&record)?));

        self.store.commit(batch).await.map_err(|e| match e {
            DocumentStoreError::PreconditionFailed { .. } => TicketingError::CapacityExceeded {
                event_id: event.id.clone(),
            },
            DocumentStoreError::NotFound { .. } => TicketingError::event_not_found(&event.id),
            other => TicketingError::Store(other),
        })?;

        tracing::info!(event_id = %event.id, ticket_id = %ticket_id, "Ticket issued");
        Ok(ticket_id)
    }

    async fn find(&self, filter: Filter) -> Result<Vec<Ticket>> {
        self.store
            .query(collections::tickets(), Query::new().filter(filter))
            .await?
            .iter()
            .map(|document| Ticket::from_document(document).map_err(TicketingError::from))
            .collect()
    }
}

fn record_outcome(result: &Result<TicketId>) {
    match result {
        Ok(_) => metrics::record_ticket_issued(),
        Err(e) => {
            if e.is_infrastructure() {
                tracing::error!(error = %e, kind = e.kind(), "Ticket purchase failed");
            } else {
                tracing::warn!(error = %e, kind = e.kind(), "Ticket purchase refused");
            }
            metrics::record_ticket_rejected(e.kind());
        }
    }
}
