//! # Evently Testing
//!
//! Testing utilities for Evently services.
//!
//! This crate provides:
//! - In-memory implementations of the core collaborator traits
//!   ([`InMemoryDocumentStore`], [`InMemoryBlobStore`],
//!   [`InMemoryIdentityProvider`])
//! - Deterministic clocks ([`FixedClock`], [`SteppingClock`])
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use evently_core::document::{CollectionPath, Patch};
//! use evently_core::document_store::DocumentStore;
//! use evently_testing::InMemoryDocumentStore;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryDocumentStore::new();
//! let events = CollectionPath::new("events");
//! let fields = json!({ "capacity": 1 }).as_object().cloned().unwrap_or_default();
//!
//! let id = store.create(events.clone(), fields).await.unwrap();
//! store.update(events.clone(), id.clone(), Patch::new().increment("capacity", -1)).await.unwrap();
//!
//! let doc = store.get(events, id).await.unwrap().unwrap();
//! assert_eq!(doc.fields["capacity"], json!(0));
//! # });
//! ```

use chrono::{DateTime, Utc};
use evently_core::environment::Clock;

pub mod in_memory;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use evently_testing::mocks::FixedClock;
    /// use evently_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step every time it is read.
    ///
    /// Useful where ordering by timestamp matters, e.g. comment threads:
    /// each comment posted in a test gets a strictly later timestamp.
    ///
    /// ```
    /// use chrono::Duration;
    /// use evently_core::environment::Clock;
    /// use evently_testing::mocks::{SteppingClock, test_clock};
    ///
    /// let clock = SteppingClock::new(test_clock().now(), Duration::seconds(1));
    /// let first = clock.now();
    /// assert_eq!(clock.now() - first, Duration::seconds(1));
    /// ```
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing by `step` per read.
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Safe to call from every test; only the first call installs it.
    /// Filtering follows `RUST_LOG`, defaulting to `warn`.
    pub fn init_test_tracing() {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// A single lowercase tag such as `"rust"`.
    pub fn tag() -> impl Strategy<Value = String> {
        "[a-z]{1,8}"
    }

    /// A comma separated tag field as typed into the event form, with
    /// stray whitespace, blanks and duplicates.
    pub fn raw_tag_field() -> impl Strategy<Value = String> {
        vec(
            prop_oneof![
                4 => tag().prop_map(|t| format!(" {t} ")),
                1 => Just(String::new()),
                1 => Just("  ".to_string()),
            ],
            0..8,
        )
        .prop_map(|parts| parts.join(","))
    }

    /// A small remaining capacity.
    pub fn capacity() -> impl Strategy<Value = u32> {
        0u32..12
    }

    /// Non-blank comment text.
    pub fn comment_content() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ,.!?]{0,40}"
    }

    /// One step of an attendance sequence.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum AttendanceStep {
        /// User `n` joins
        Join(usize),
        /// User `n` leaves
        Leave(usize),
    }

    /// Sequences of joins and leaves over `users` distinct users.
    pub fn attendance_steps(users: usize) -> impl Strategy<Value = Vec<AttendanceStep>> {
        vec(
            prop_oneof![
                (0..users).prop_map(AttendanceStep::Join),
                (0..users).prop_map(AttendanceStep::Leave),
            ],
            0..24,
        )
    }
}

// Re-export commonly used items
pub use in_memory::{InMemoryBlobStore, InMemoryDocumentStore, InMemoryIdentityProvider};
pub use mocks::{FixedClock, SteppingClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn stepping_clock_is_strictly_increasing() {
        let clock = SteppingClock::new(test_clock().now(), Duration::milliseconds(5));
        let a = clock.now();
        let b = clock.now();
        let c = clock.now();
        assert!(a < b && b < c);
        assert_eq!(a, test_clock().now());
    }
}
