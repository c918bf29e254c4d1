//! Error type shared by every ticketing service.

use crate::forms::FormError;
use crate::payment::PaymentError;
use crate::types::EventId;
use evently_core::blob_store::BlobStoreError;
use evently_core::document_store::DocumentStoreError;
use evently_core::identity::IdentityError;
use thiserror::Error;

/// Result type for ticketing operations.
pub type Result<T> = std::result::Result<T, TicketingError>;

/// Errors returned by the ticketing services.
#[derive(Error, Debug)]
pub enum TicketingError {
    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity ("event", "comment", ...)
        entity: &'static str,
        /// Identifier that did not resolve
        id: String,
    },

    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No tickets left for the event.
    #[error("Capacity exceeded for event {event_id}")]
    CapacityExceeded {
        /// Sold-out event
        event_id: EventId,
    },

    /// Credential or session resolution failure.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The session may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The payment processor rejected the card.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Document store failure.
    #[error("Store error: {0}")]
    Store(#[from] DocumentStoreError),

    /// Blob storage failure.
    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobStoreError),
}

impl TicketingError {
    /// `NotFound` for an event.
    #[must_use]
    pub fn event_not_found(id: &EventId) -> Self {
        Self::NotFound {
            entity: "event",
            id: id.to_string(),
        }
    }

    /// Short label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::Auth(_) => "auth",
            Self::Forbidden(_) => "forbidden",
            Self::Payment(_) => "payment",
            Self::Store(_) => "store",
            Self::Blob(_) => "blob",
        }
    }

    /// Backend failure rather than a refusal of the request.
    ///
    /// Infrastructure failures are logged at `error`, refusals at `warn`.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Blob(_))
    }
}

impl From<IdentityError> for TicketingError {
    fn from(error: IdentityError) -> Self {
        Self::Auth(error.to_string())
    }
}

impl From<FormError> for TicketingError {
    fn from(error: FormError) -> Self {
        Self::Validation(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_errors_become_auth_errors() {
        let error = TicketingError::from(IdentityError::WeakPassword);
        assert!(matches!(error, TicketingError::Auth(ref msg) if msg.contains('6')));
        assert_eq!(error.kind(), "auth");
    }

    #[test]
    fn not_found_names_the_entity() {
        let error = TicketingError::event_not_found(&EventId::new("e9"));
        assert_eq!(error.to_string(), "event not found: e9");
    }

    #[test]
    fn only_backend_failures_are_infrastructure() {
        let store = TicketingError::from(DocumentStoreError::DatabaseError("down".into()));
        let blob = TicketingError::from(BlobStoreError::UploadFailed("down".into()));
        assert!(store.is_infrastructure());
        assert!(blob.is_infrastructure());

        let sold_out = TicketingError::CapacityExceeded {
            event_id: EventId::new("e1"),
        };
        assert!(!sold_out.is_infrastructure());
        assert!(!TicketingError::Forbidden("no".into()).is_infrastructure());
    }
}
