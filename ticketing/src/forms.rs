//! Validated forms.
//!
//! Raw forms hold the strings exactly as captured from the user. `parse`
//! turns them into typed structs or a [`FormError`] naming the offending
//! field; services only ever see the validated types.

use crate::types::{Capacity, EventDetails, Role, Tags, UserId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use evently_core::document::Patch;
use evently_core::identity::Credentials;
use serde_json::Value;
use thiserror::Error;

/// Maximum length of an event title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of a username, in characters.
pub const MAX_USERNAME_LEN: usize = 50;

/// Form validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// A required field is blank.
    #[error("`{0}` is required")]
    Required(&'static str),

    /// A field exceeds its maximum length.
    #[error("`{field}` must be at most {max} characters")]
    TooLong {
        /// Offending field
        field: &'static str,
        /// Maximum length in characters
        max: usize,
    },

    /// A field does not parse.
    #[error("`{field}` is invalid: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::Required(field));
    }
    Ok(value.to_string())
}

fn bounded(field: &'static str, value: String, max: usize) -> Result<String, FormError> {
    if value.chars().count() > max {
        return Err(FormError::TooLong { field, max });
    }
    Ok(value)
}

/// Parse an event date.
///
/// Accepts RFC 3339 (`2025-03-01T18:00:00-05:00`), a local date-time without
/// offset (taken as UTC), or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, FormError> {
    let value = required(field, value)?;
    if let Ok(date) = DateTime::parse_from_rfc3339(&value) {
        return Ok(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(local) = NaiveDateTime::parse_from_str(&value, format) {
            return Ok(local.and_utc());
        }
    }
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| FormError::Invalid {
            field,
            reason: format!("`{value}` is not a date"),
        })
}

fn parse_birth_date(value: &str) -> Result<Option<NaiveDate>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FormError::Invalid {
            field: "birthDate",
            reason: format!("`{value}` is not a YYYY-MM-DD date"),
        })
}

/// Split a comma separated tag field.
///
/// ```
/// use ticketing::forms::parse_tags;
///
/// let tags = parse_tags(" ai, ml ,,ai ");
/// assert_eq!(tags.iter().collect::<Vec<_>>(), ["ai", "ml"]);
/// ```
#[must_use]
pub fn parse_tags(value: &str) -> Tags {
    value.split(',').collect()
}

// ============================================================================
// Events
// ============================================================================

/// Event form as captured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawEventForm {
    /// Title
    pub title: String,
    /// Date, RFC 3339 or `YYYY-MM-DD`
    pub date: String,
    /// Description
    pub description: String,
    /// Comma separated tags
    pub tags: String,
    /// Capacity
    pub capacity: String,
    /// Location
    pub location: String,
}

/// Validated event form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventForm {
    /// Title, non-blank and at most [`MAX_TITLE_LEN`] characters
    pub title: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Description (may be empty)
    pub description: String,
    /// Tags
    pub tags: Tags,
    /// Number of purchasable tickets
    pub capacity: Capacity,
    /// Location (may be empty)
    pub location: String,
}

impl EventForm {
    /// Validate a raw event form.
    ///
    /// # Errors
    ///
    /// [`FormError`] naming the first invalid field.
    pub fn parse(raw: &RawEventForm) -> Result<Self, FormError> {
        let title = bounded("title", required("title", &raw.title)?, MAX_TITLE_LEN)?;
        let date = parse_date("date", &raw.date)?;
        let capacity = required("capacity", &raw.capacity)?
            .parse::<u32>()
            .map(Capacity::new)
            .map_err(|_| FormError::Invalid {
                field: "capacity",
                reason: format!("`{}` is not a non-negative integer", raw.capacity.trim()),
            })?;

        Ok(Self {
            title,
            date,
            description: raw.description.trim().to_string(),
            tags: parse_tags(&raw.tags),
            capacity,
            location: raw.location.trim().to_string(),
        })
    }

    /// Stored fields for an event owned by `organizer_id`.
    #[must_use]
    pub fn into_details(self, organizer_id: UserId, photo: Option<String>) -> EventDetails {
        EventDetails {
            title: self.title,
            date: self.date,
            description: self.description,
            tags: self.tags,
            organizer_id,
            photo,
            capacity: self.capacity,
            location: self.location,
        }
    }
}

/// Search parameters: title prefix and/or any-of tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    text: Option<String>,
    tags: Tags,
}

impl SearchQuery {
    /// Build a search.
    ///
    /// # Errors
    ///
    /// [`FormError::Required`] when `text` is blank and no tag is given.
    pub fn new<I, S>(text: &str, tags: I) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = text.trim();
        let tags = Tags::new(tags);
        if text.is_empty() && tags.is_empty() {
            return Err(FormError::Required("query"));
        }
        Ok(Self {
            text: (!text.is_empty()).then(|| text.to_string()),
            tags,
        })
    }

    /// Title prefix, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Tags, any of which must match
    #[must_use]
    pub const fn tags(&self) -> &Tags {
        &self.tags
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Registration form as captured.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawRegistrationForm {
    /// Email
    pub email: String,
    /// Password
    pub password: String,
    /// Password confirmation
    pub confirm_password: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Display name
    pub username: String,
    /// Optional `YYYY-MM-DD`
    pub birth_date: String,
    /// `organizer` or `client` (blank means client)
    pub role: String,
}

impl std::fmt::Debug for RawRegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawRegistrationForm")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Validated registration form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationForm {
    /// Credentials handed to the identity provider
    pub credentials: Credentials,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Display name
    pub username: String,
    /// Date of birth
    pub birth_date: Option<NaiveDate>,
    /// Requested role
    pub role: Role,
}

impl RegistrationForm {
    /// Validate a raw registration form.
    ///
    /// Password strength is checked by the identity provider.
    ///
    /// # Errors
    ///
    /// [`FormError`] naming the first invalid field.
    pub fn parse(raw: &RawRegistrationForm) -> Result<Self, FormError> {
        let email = required("email", &raw.email)?;
        if raw.password.is_empty() {
            return Err(FormError::Required("password"));
        }
        if raw.password != raw.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        let first_name = required("firstName", &raw.first_name)?;
        let last_name = required("lastName", &raw.last_name)?;
        let username = bounded("username", required("username", &raw.username)?, MAX_USERNAME_LEN)?;
        let birth_date = parse_birth_date(&raw.birth_date)?;
        let role = if raw.role.trim().is_empty() {
            Role::default()
        } else {
            raw.role
                .parse()
                .map_err(|reason| FormError::Invalid { field: "role", reason })?
        };

        Ok(Self {
            credentials: Credentials::new(email, raw.password.clone()),
            first_name,
            last_name,
            username,
            birth_date,
            role,
        })
    }
}

/// Profile edit as captured. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawProfileForm {
    /// New display name
    pub username: Option<String>,
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New date of birth, `YYYY-MM-DD`; blank clears it
    pub birth_date: Option<String>,
}

/// Validated partial profile update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileForm {
    /// New display name
    pub username: Option<String>,
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// `Some(None)` clears the date of birth
    pub birth_date: Option<Option<NaiveDate>>,
}

impl ProfileForm {
    /// Validate a raw profile edit.
    ///
    /// # Errors
    ///
    /// [`FormError`] when a provided name is blank or too long, or the date
    /// does not parse.
    pub fn parse(raw: &RawProfileForm) -> Result<Self, FormError> {
        let username = raw
            .username
            .as_deref()
            .map(|name| bounded("username", required("username", name)?, MAX_USERNAME_LEN))
            .transpose()?;
        let first_name = raw
            .first_name
            .as_deref()
            .map(|name| required("firstName", name))
            .transpose()?;
        let last_name = raw
            .last_name
            .as_deref()
            .map(|name| required("lastName", name))
            .transpose()?;
        let birth_date = raw.birth_date.as_deref().map(parse_birth_date).transpose()?;

        Ok(Self {
            username,
            first_name,
            last_name,
            birth_date,
        })
    }

    /// Check if the form changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.birth_date.is_none()
    }

    /// Patch applying this edit to a `users/{id}` document.
    #[must_use]
    pub fn to_patch(&self) -> Patch {
        let mut patch = Patch::new();
        if let Some(username) = &self.username {
            patch = patch.set("username", username.as_str());
        }
        if let Some(first_name) = &self.first_name {
            patch = patch.set("firstName", first_name.as_str());
        }
        if let Some(last_name) = &self.last_name {
            patch = patch.set("lastName", last_name.as_str());
        }
        match self.birth_date {
            Some(Some(date)) => patch = patch.set("birthDate", Value::String(date.format("%Y-%m-%d").to_string())),
            Some(None) => patch = patch.remove("birthDate"),
            None => {}
        }
        patch
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw_event() -> RawEventForm {
        RawEventForm {
            title: "  RustConf ".into(),
            date: "2025-09-02".into(),
            description: "Talks".into(),
            tags: "rust, conference,,rust".into(),
            capacity: "150".into(),
            location: "Seattle".into(),
        }
    }

    #[test]
    fn event_form_parses_and_trims() {
        let form = EventForm::parse(&raw_event()).unwrap();
        assert_eq!(form.title, "RustConf");
        assert_eq!(form.capacity, Capacity::new(150));
        assert_eq!(form.tags.iter().collect::<Vec<_>>(), ["conference", "rust"]);
        assert_eq!(form.date.to_rfc3339(), "2025-09-02T00:00:00+00:00");
    }

    #[test]
    fn event_form_accepts_rfc3339_with_offset() {
        let raw = RawEventForm {
            date: "2025-09-02T18:30:00-05:00".into(),
            ..raw_event()
        };
        let form = EventForm::parse(&raw).unwrap();
        assert_eq!(form.date.to_rfc3339(), "2025-09-02T23:30:00+00:00");
    }

    #[test]
    fn event_form_rejects_bad_fields() {
        let blank_title = RawEventForm { title: "   ".into(), ..raw_event() };
        assert_eq!(EventForm::parse(&blank_title), Err(FormError::Required("title")));

        let long_title = RawEventForm { title: "x".repeat(MAX_TITLE_LEN + 1), ..raw_event() };
        assert!(matches!(EventForm::parse(&long_title), Err(FormError::TooLong { field: "title", .. })));

        let negative = RawEventForm { capacity: "-1".into(), ..raw_event() };
        assert!(matches!(EventForm::parse(&negative), Err(FormError::Invalid { field: "capacity", .. })));

        let missing = RawEventForm { capacity: String::new(), ..raw_event() };
        assert_eq!(EventForm::parse(&missing), Err(FormError::Required("capacity")));

        let bad_date = RawEventForm { date: "next friday".into(), ..raw_event() };
        assert!(matches!(EventForm::parse(&bad_date), Err(FormError::Invalid { field: "date", .. })));
    }

    #[test]
    fn search_needs_text_or_tags() {
        assert_eq!(
            SearchQuery::new("  ", Vec::<String>::new()),
            Err(FormError::Required("query"))
        );
        let by_tag = SearchQuery::new("", ["ai"]).unwrap();
        assert_eq!(by_tag.text(), None);
        assert!(by_tag.tags().contains("ai"));
        assert_eq!(SearchQuery::new(" Rust ", [""; 0]).unwrap().text(), Some("Rust"));
    }

    fn raw_registration() -> RawRegistrationForm {
        RawRegistrationForm {
            email: "ana@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            first_name: "Ana".into(),
            last_name: "Lopez".into(),
            username: "ana".into(),
            birth_date: "1990-04-01".into(),
            role: "Organizer".into(),
        }
    }

    #[test]
    fn registration_form_validates() {
        let form = RegistrationForm::parse(&raw_registration()).unwrap();
        assert_eq!(form.role, Role::Organizer);
        assert_eq!(form.birth_date, NaiveDate::from_ymd_opt(1990, 4, 1));

        let mismatch = RawRegistrationForm { confirm_password: "other".into(), ..raw_registration() };
        assert_eq!(RegistrationForm::parse(&mismatch), Err(FormError::PasswordMismatch));

        let no_role = RawRegistrationForm { role: String::new(), ..raw_registration() };
        assert_eq!(RegistrationForm::parse(&no_role).unwrap().role, Role::Client);

        let bad_role = RawRegistrationForm { role: "admin".into(), ..raw_registration() };
        assert!(matches!(RegistrationForm::parse(&bad_role), Err(FormError::Invalid { field: "role", .. })));
    }

    #[test]
    fn raw_registration_debug_hides_password() {
        let debug = format!("{:?}", raw_registration());
        assert!(!debug.contains("secret1"));
    }

    #[test]
    fn profile_form_builds_partial_patch() {
        let form = ProfileForm::parse(&RawProfileForm {
            username: Some(" ana2 ".into()),
            birth_date: Some(String::new()),
            ..RawProfileForm::default()
        })
        .unwrap();
        assert_eq!(form.username.as_deref(), Some("ana2"));
        assert_eq!(form.birth_date, Some(None));
        assert_eq!(form.to_patch().updates().len(), 2);

        let blank = RawProfileForm { first_name: Some("  ".into()), ..RawProfileForm::default() };
        assert_eq!(ProfileForm::parse(&blank), Err(FormError::Required("firstName")));
        assert!(ProfileForm::parse(&RawProfileForm::default()).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn parsed_tags_are_trimmed_and_non_blank(raw in evently_testing::properties::raw_tag_field()) {
            let tags = parse_tags(&raw);
            for tag in tags.iter() {
                prop_assert!(!tag.is_empty());
                prop_assert_eq!(tag, tag.trim());
            }
            let expected: std::collections::BTreeSet<&str> =
                raw.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
            prop_assert_eq!(tags.iter().collect::<std::collections::BTreeSet<_>>(), expected);
        }
    }
}
