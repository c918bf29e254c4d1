//! Attendance tests: join/leave behave as set membership.
//!
//! Run with: `cargo test --test attendance_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{client, create_event, fixture, organizer};
use evently_testing::properties::{AttendanceStep, attendance_steps};
use proptest::prelude::*;
use std::collections::BTreeSet;
use ticketing::{EventId, TicketingError};

#[tokio::test]
async fn test_join_is_idempotent() {
    let f = fixture();
    let event_id = create_event(&f.app, &organizer("olga"), "Rust Meetup", 10).await;
    let ana = client("ana");

    f.app.attendance.join_event(&ana, &event_id).await.unwrap();
    f.app.attendance.join_event(&ana, &event_id).await.unwrap();

    let record = f.app.attendance.attendance(&ana.user_id).await.unwrap();
    assert_eq!(record.attending_events.len(), 1);
    assert!(f.app.attendance.is_attending(&ana.user_id, &event_id).await.unwrap());
}

#[tokio::test]
async fn test_leave_without_joining_is_a_no_op() {
    let f = fixture();
    let event_id = create_event(&f.app, &organizer("olga"), "Rust Meetup", 10).await;
    let ana = client("ana");

    f.app.attendance.leave_event(&ana, &event_id).await.unwrap();

    assert!(!f.app.attendance.is_attending(&ana.user_id, &event_id).await.unwrap());
}

#[tokio::test]
async fn test_joining_unknown_event_fails() {
    let f = fixture();
    let result = f
        .app
        .attendance
        .join_event(&client("ana"), &EventId::new("missing"))
        .await;

    assert!(matches!(result, Err(TicketingError::NotFound { entity: "event", .. })));
}

#[tokio::test]
async fn test_attending_events_skips_deleted_events() {
    let f = fixture();
    let owner = organizer("olga");
    let kept = create_event(&f.app, &owner, "Kept", 10).await;
    let deleted = create_event(&f.app, &owner, "Deleted", 10).await;
    let ana = client("ana");

    f.app.attendance.join_event(&ana, &kept).await.unwrap();
    f.app.attendance.join_event(&ana, &deleted).await.unwrap();
    f.app.events.delete_event(&owner, &deleted).await.unwrap();

    let events = f.app.attendance.attending_events(&ana.user_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, kept);

    // Leaving a deleted event still clears it from the record.
    f.app.attendance.leave_event(&ana, &deleted).await.unwrap();
    let record = f.app.attendance.attendance(&ana.user_id).await.unwrap();
    assert_eq!(record.attending_events, BTreeSet::from([kept]));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_membership_follows_last_operation(steps in attendance_steps(3)) {
        tokio_test::block_on(async {
            let f = fixture();
            let event_id = create_event(&f.app, &organizer("olga"), "Prop Event", 10).await;
            let users: Vec<_> = (0..3).map(|n| client(&format!("u{n}"))).collect();
            let mut expected = BTreeSet::new();

            for step in &steps {
                match *step {
                    AttendanceStep::Join(n) => {
                        f.app.attendance.join_event(&users[n], &event_id).await.unwrap();
                        expected.insert(n);
                    }
                    AttendanceStep::Leave(n) => {
                        f.app.attendance.leave_event(&users[n], &event_id).await.unwrap();
                        expected.remove(&n);
                    }
                }
            }

            for (n, user) in users.iter().enumerate() {
                let attending = f.app.attendance.is_attending(&user.user_id, &event_id).await.unwrap();
                assert_eq!(attending, expected.contains(&n), "user {n} after {steps:?}");
            }
        });
    }
}
