//! Shared fixtures for the ticketing integration tests.

#![allow(dead_code)]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::Duration;
use evently_core::environment::Clock;
use evently_testing::helpers::init_test_tracing;
use evently_testing::mocks::{SteppingClock, test_clock};
use evently_testing::{InMemoryBlobStore, InMemoryDocumentStore, InMemoryIdentityProvider};
use std::sync::Arc;
use ticketing::payment::MockPaymentProcessor;
use ticketing::{CardDetails, Config, EventForm, EventId, RawEventForm, Role, Session, TicketingApp, UserId};

/// App over in-memory collaborators, with handles on the doubles.
pub struct Fixture {
    pub app: TicketingApp,
    pub store: InMemoryDocumentStore,
    pub blobs: InMemoryBlobStore,
}

/// Fixture whose clock advances one second per read.
pub fn fixture() -> Fixture {
    fixture_with_clock(Arc::new(SteppingClock::new(test_clock().now(), Duration::seconds(1))))
}

pub fn fixture_with_clock(clock: Arc<dyn Clock>) -> Fixture {
    init_test_tracing();
    let config = Config::default();
    let store = InMemoryDocumentStore::new();
    let blobs = InMemoryBlobStore::new(config.blobs.public_base_url.clone());
    let app = TicketingApp::new(
        config,
        Arc::new(store.clone()),
        Arc::new(blobs.clone()),
        Arc::new(InMemoryIdentityProvider::new()),
        MockPaymentProcessor::shared(),
        clock,
    );
    Fixture { app, store, blobs }
}

pub fn organizer(id: &str) -> Session {
    Session::new(UserId::new(id), id, Role::Organizer)
}

pub fn client(id: &str) -> Session {
    Session::new(UserId::new(id), id, Role::Client)
}

pub fn event_form(title: &str, tags: &str, capacity: u32) -> EventForm {
    EventForm::parse(&RawEventForm {
        title: title.to_string(),
        date: "2026-05-01T19:00".to_string(),
        description: "An evening of talks".to_string(),
        tags: tags.to_string(),
        capacity: capacity.to_string(),
        location: "Lisbon".to_string(),
    })
    .unwrap()
}

pub async fn create_event(app: &TicketingApp, owner: &Session, title: &str, capacity: u32) -> EventId {
    app.events
        .create_event(owner, event_form(title, "", capacity), None)
        .await
        .unwrap()
}

pub fn card() -> CardDetails {
    CardDetails::new("4242424242424242", 12, 2030, "123")
}
