//! Document collections used by the ticketing services.

use crate::types::EventId;
use evently_core::document::CollectionPath;

/// Events, keyed by [`EventId`]
pub const EVENTS: &str = "events";
/// User profiles, keyed by user id
pub const USERS: &str = "users";
/// Attendance records, keyed by user id
pub const USER_ROLES: &str = "userRoles";
/// Issued tickets
pub const TICKETS: &str = "tickets";
/// Sub-collection of comments under each event
pub const COMMENTS: &str = "comments";

/// `events`
#[must_use]
pub fn events() -> CollectionPath {
    CollectionPath::new(EVENTS)
}

/// `users`
#[must_use]
pub fn users() -> CollectionPath {
    CollectionPath::new(USERS)
}

/// `userRoles`
#[must_use]
pub fn user_roles() -> CollectionPath {
    CollectionPath::new(USER_ROLES)
}

/// `tickets`
#[must_use]
pub fn tickets() -> CollectionPath {
    CollectionPath::new(TICKETS)
}

/// `events/{event_id}/comments`
#[must_use]
pub fn comments(event_id: &EventId) -> CollectionPath {
    events().nested(&event_id.document_id(), COMMENTS)
}
