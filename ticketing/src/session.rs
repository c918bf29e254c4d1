//! Explicit per-call session context.
//!
//! Every mutating operation takes the caller's [`Session`]; there is no
//! ambient "current user".

use crate::error::{Result, TicketingError};
use crate::types::{Event, Role, UserId};

/// Identity of the caller of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Signed-in user
    pub user_id: UserId,
    /// Display name used for comments and replies
    pub username: String,
    /// Role from the user's profile
    pub role: Role,
}

impl Session {
    /// Creates a new `Session`
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    /// Display name, or `fallback` when the username is blank.
    #[must_use]
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        let name = self.username.trim();
        if name.is_empty() { fallback } else { name }
    }

    /// Check if the session belongs to an organizer
    #[must_use]
    pub fn is_organizer(&self) -> bool {
        self.role == Role::Organizer
    }

    /// Require the organizer role.
    ///
    /// # Errors
    ///
    /// [`TicketingError::Forbidden`] for clients.
    pub fn require_organizer(&self) -> Result<()> {
        if self.is_organizer() {
            Ok(())
        } else {
            Err(TicketingError::Forbidden(format!(
                "user {} is not an organizer",
                self.user_id
            )))
        }
    }

    /// Require that this session's user organizes `event`.
    ///
    /// # Errors
    ///
    /// [`TicketingError::Forbidden`] for anyone but the owning organizer.
    pub fn require_owner(&self, event: &Event) -> Result<()> {
        self.require_organizer()?;
        if event.is_organized_by(&self.user_id) {
            Ok(())
        } else {
            Err(TicketingError::Forbidden(format!(
                "user {} does not organize event {}",
                self.user_id, event.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_username_falls_back() {
        let session = Session::new(UserId::new("u1"), "   ", Role::Client);
        assert_eq!(session.display_name("Anonymous"), "Anonymous");

        let named = Session::new(UserId::new("u1"), " ana ", Role::Client);
        assert_eq!(named.display_name("Anonymous"), "ana");
    }

    #[test]
    fn clients_are_not_organizers() {
        let session = Session::new(UserId::new("u1"), "ana", Role::Client);
        assert!(matches!(session.require_organizer(), Err(TicketingError::Forbidden(_))));
    }
}
