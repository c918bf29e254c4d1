//! Application wiring.
//!
//! [`TicketingApp`] builds every service over one set of collaborators
//! (document store, blob store, identity provider, payment processor, clock)
//! chosen from the [`Config`](crate::config::Config).

mod coordinator;

pub use coordinator::{AppError, TicketingApp};
