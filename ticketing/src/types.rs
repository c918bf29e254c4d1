//! Domain types for Evently.
//!
//! This module contains the identifiers, value objects and stored records of
//! the ticketing domain. Records map one-to-one onto documents; field names
//! are camelCase in storage.

use chrono::{DateTime, NaiveDate, Utc};
use evently_core::document::{Document, DocumentId};
use evently_core::document_store::DocumentStoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a `", stringify!($name), "` from an existing identifier")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Document id this identifier addresses
            #[must_use]
            pub fn document_id(&self) -> DocumentId {
                DocumentId::new(self.0.clone())
            }
        }

        impl From<DocumentId> for $name {
            fn from(id: DocumentId) -> Self {
                Self(id.into_inner())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

document_id!(
    /// Unique identifier for an event
    EventId
);
document_id!(
    /// Unique identifier for a user (issued by the identity provider)
    UserId
);
document_id!(
    /// Unique identifier for a comment within an event's thread
    CommentId
);
document_id!(
    /// Unique identifier for an issued ticket
    TicketId
);

// ============================================================================
// Value objects
// ============================================================================

/// Set of event tags. Order is irrelevant; stored sorted.
///
/// Tags are trimmed and blanks are dropped on construction.
///
/// ```
/// use ticketing::types::Tags;
///
/// let tags = Tags::new(["ml", " ai ", "", "ml"]);
/// assert_eq!(tags.iter().collect::<Vec<_>>(), ["ai", "ml"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    /// Build a tag set from raw strings.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            tags.into_iter()
                .map(|tag| tag.as_ref().trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
        )
    }

    /// Iterate over the tags in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Check if `tag` is in the set
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Number of tags
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no tags
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags as JSON values, for array filters.
    #[must_use]
    pub fn to_values(&self) -> Vec<Value> {
        self.0.iter().cloned().map(Value::String).collect()
    }

    /// Consume the set, returning the inner `BTreeSet`
    #[must_use]
    pub fn into_inner(self) -> BTreeSet<String> {
        self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Remaining number of purchasable tickets for an event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// At least one ticket left
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapper for an event date with a human-readable `Display`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventDate(DateTime<Utc>);

impl EventDate {
    /// Creates a new `EventDate`
    #[must_use]
    pub const fn new(date: DateTime<Utc>) -> Self {
        Self(date)
    }

    /// Returns the inner `DateTime`
    #[must_use]
    pub const fn inner(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M UTC"))
    }
}

/// User role
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May create, edit and delete their own events
    Organizer,
    /// Joins events and purchases tickets
    #[default]
    Client,
}

impl Role {
    /// Stored name of the role
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Organizer => "organizer",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "organizer" => Ok(Self::Organizer),
            "client" => Ok(Self::Client),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Stored fields of an event (`events/{id}`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    /// Event title
    pub title: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Tags used for search
    #[serde(default)]
    pub tags: Tags,
    /// Organizer who owns the event
    pub organizer_id: UserId,
    /// Public URL of the event photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Remaining purchasable tickets
    pub capacity: Capacity,
    /// Where the event takes place
    #[serde(default)]
    pub location: String,
}

/// An event with its identifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Stored fields
    pub details: EventDetails,
}

impl Event {
    /// Decode an event document.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the document is not a valid event.
    pub fn from_document(document: &Document) -> Result<Self, DocumentStoreError> {
        Ok(Self {
            id: EventId::from(document.id.clone()),
            details: document.decode()?,
        })
    }

    /// Check if `user` organizes this event
    #[must_use]
    pub fn is_organized_by(&self, user: &UserId) -> bool {
        &self.details.organizer_id == user
    }
}

// ============================================================================
// Comments
// ============================================================================

/// A reply appended to a comment. Not individually addressable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// Author
    pub user_id: UserId,
    /// Author display name at the time of writing
    pub username: String,
    /// Reply text
    pub content: String,
    /// Creation time, stored as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Stored fields of a comment (`events/{eventId}/comments/{id}`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentBody {
    /// Author
    pub user_id: UserId,
    /// Author display name at the time of writing
    pub username: String,
    /// Comment text
    pub content: String,
    /// Creation time, stored as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Replies in append order
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// A comment with its identifier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    /// Identifier within the event's thread
    pub id: CommentId,
    /// Stored fields
    pub body: CommentBody,
}

impl Comment {
    /// Decode a comment document.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the document is not a valid comment.
    pub fn from_document(document: &Document) -> Result<Self, DocumentStoreError> {
        Ok(Self {
            id: CommentId::from(document.id.clone()),
            body: document.decode()?,
        })
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Stored fields of a ticket (`tickets/{id}`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Ticket holder
    pub user_id: UserId,
}

/// An issued ticket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// Unique ticket identifier
    pub id: TicketId,
    /// Stored fields
    pub record: TicketRecord,
}

impl Ticket {
    /// Decode a ticket document.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the document is not a valid ticket.
    pub fn from_document(document: &Document) -> Result<Self, DocumentStoreError> {
        Ok(Self {
            id: TicketId::from(document.id.clone()),
            record: document.decode()?,
        })
    }
}

/// Plain-text proof of purchase
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketReceipt {
    /// Ticket the receipt is for
    pub ticket_id: TicketId,
    /// Title of the event
    pub event_title: String,
    /// Date of the event, if known
    pub event_date: Option<EventDate>,
}

impl fmt::Display for TicketReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Event: {}", self.event_title)?;
        match &self.event_date {
            Some(date) => write!(f, "Date: {date}"),
            None => write!(f, "Date: Date unavailable"),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Events a user is attending (`userRoles/{userId}`)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    /// Attended event ids
    #[serde(default)]
    pub attending_events: BTreeSet<EventId>,
}

/// Profile document (`users/{userId}`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Account email
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Display name
    pub username: String,
    /// Date of birth, `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    /// Role
    #[serde(default)]
    pub role: Role,
    /// Avatar URL
    #[serde(rename = "photoURL", default)]
    pub photo_url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use evently_core::document::to_fields;
    use serde_json::json;

    #[test]
    fn tags_are_trimmed_sorted_and_deduplicated() {
        let tags: Tags = ["ml", "ai", " ml ", "  "].into_iter().collect();
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("ai"));
        assert_eq!(tags.to_values(), vec![json!("ai"), json!("ml")]);
    }

    #[test]
    fn event_details_use_camel_case_fields() {
        let details = EventDetails {
            title: "RustConf".into(),
            date: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            description: String::new(),
            tags: Tags::new(["rust"]),
            organizer_id: UserId::new("o1"),
            photo: None,
            capacity: Capacity::new(3),
            location: "Montreal".into(),
        };
        let fields = to_fields(&details).unwrap();
        assert_eq!(fields["organizerId"], json!("o1"));
        assert_eq!(fields["capacity"], json!(3));
        assert_eq!(fields["tags"], json!(["rust"]));
        assert!(!fields.contains_key("photo"));
    }

    #[test]
    fn comment_timestamps_are_epoch_millis() {
        let body = CommentBody {
            user_id: UserId::new("u1"),
            username: "ana".into(),
            content: "hello".into(),
            timestamp: DateTime::from_timestamp_millis(1_234).unwrap(),
            replies: Vec::new(),
        };
        let fields = to_fields(&body).unwrap();
        assert_eq!(fields["timestamp"], json!(1_234));
        assert_eq!(fields["userId"], json!("u1"));
    }

    #[test]
    fn profile_reads_legacy_field_names() {
        let profile: UserProfile = serde_json::from_value(json!({
            "email": "ana@example.com",
            "firstName": "Ana",
            "lastName": "Lopez",
            "username": "ana",
            "birthDate": "1990-04-01",
            "role": "organizer",
            "photoURL": "https://cdn.test/a.png"
        }))
        .unwrap();
        assert_eq!(profile.role, Role::Organizer);
        assert_eq!(profile.birth_date, NaiveDate::from_ymd_opt(1990, 4, 1));
    }

    #[test]
    fn receipt_text_falls_back_when_date_is_unknown() {
        let receipt = TicketReceipt {
            ticket_id: TicketId::new("t1"),
            event_title: "RustConf".into(),
            event_date: None,
        };
        assert_eq!(receipt.to_string(), "Event: RustConf\nDate: Date unavailable");

        let dated = TicketReceipt {
            event_date: Some(EventDate::new(DateTime::from_timestamp(0, 0).unwrap())),
            ..receipt
        };
        assert_eq!(dated.to_string(), "Event: RustConf\nDate: 1970-01-01 00:00 UTC");
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Organizer".parse::<Role>(), Ok(Role::Organizer));
        assert!("admin".parse::<Role>().is_err());
    }
}
