//! Evently Demo
//!
//! Walks through the main flows against the configured store:
//! - Organizer and attendee registration
//! - Event creation and tag search
//! - Join, comment and reply
//! - Ticket purchase until the event sells out
//!
//! # Usage
//!
//! ```bash
//! # In-memory store
//! cargo run --bin demo
//!
//! # PostgreSQL store
//! EVENTLY_STORE=postgres DATABASE_URL=postgres://localhost/evently cargo run --bin demo
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use ticketing::payment::DECLINED_TEST_CARD;
use ticketing::{
    CardDetails, Config, EventForm, RawEventForm, RawRegistrationForm, RegistrationForm, SearchQuery,
    TicketingApp, TicketingError,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},sqlx=warn", config.app.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus = PrometheusBuilder::new().install_recorder()?;
    ticketing::metrics::register_business_metrics();

    println!("\n🎫 ============================================");
    println!("   Evently - Live Demo");
    println!("============================================\n");

    println!("⚙️  Initializing application ({} store)...", config.store.backend);
    let app = TicketingApp::connect(config).await?;
    println!("✓ Application ready\n");

    // Step 1: Accounts
    println!("1️⃣  Registering an organizer and two attendees...");
    let organizer = app
        .accounts
        .register(RegistrationForm::parse(&registration("olga@example.com", "olga", "organizer"))?)
        .await?;
    let ana = app
        .accounts
        .register(RegistrationForm::parse(&registration("ana@example.com", "ana", "client"))?)
        .await?;
    let ben = app
        .accounts
        .register(RegistrationForm::parse(&registration("ben@example.com", "ben", "client"))?)
        .await?;
    println!("   ✓ {} (organizer), {} and {}\n", organizer.username, ana.username, ben.username);

    // Step 2: Event
    println!("2️⃣  Creating an event with a single ticket...");
    let form = EventForm::parse(&RawEventForm {
        title: "Rust Meetup".to_string(),
        date: "2026-03-14T18:30".to_string(),
        description: "Lightning talks and pizza".to_string(),
        tags: "rust, meetup, rust".to_string(),
        capacity: "1".to_string(),
        location: "Montreal".to_string(),
    })?;
    let event_id = app.events.create_event(&organizer, form, None).await?;
    let event = app.events.event(&event_id).await?;
    println!(
        "   ✓ {} on {} (capacity {}, tags {:?})\n",
        event.details.title,
        ticketing::EventDate::new(event.details.date),
        event.details.capacity,
        event.details.tags.iter().collect::<Vec<_>>()
    );

    // Step 3: Search
    println!("3️⃣  Searching by tag...");
    let results = app.events.search(&SearchQuery::new("", ["rust"])?).await?;
    println!("   ✓ {} result(s) for tag `rust`\n", results.len());

    // Step 4: Attendance and comments
    println!("4️⃣  Joining and commenting...");
    app.attendance.join_event(&ana, &event_id).await?;
    let comment_id = app.comments.add_comment(&ana, &event_id, "Is there parking?").await?;
    app.comments
        .add_reply(&organizer, &event_id, &comment_id, "Yes, behind the venue.")
        .await?;
    for comment in app.comments.thread(&event_id).await? {
        println!("   💬 {}: {}", comment.body.username, comment.body.content);
        for reply in &comment.body.replies {
            println!("      ↳ {}: {}", reply.username, reply.content);
        }
    }
    println!();

    // Step 5: Tickets
    println!("5️⃣  Purchasing tickets...");
    let declined = app
        .tickets
        .purchase_ticket(&ben, &event_id, CardDetails::new(DECLINED_TEST_CARD, 12, 2030, "123"))
        .await;
    if let Err(e) = declined {
        println!("   ✗ Ben's card: {e}");
    }

    let ticket_id = app
        .tickets
        .purchase_ticket(&ana, &event_id, CardDetails::new("4242 4242 4242 4242", 12, 2030, "123"))
        .await?;
    println!("   ✓ Ana's ticket {ticket_id}");

    match app
        .tickets
        .purchase_ticket(&ben, &event_id, CardDetails::new("4242424242424242", 12, 2030, "123"))
        .await
    {
        Err(TicketingError::CapacityExceeded { .. }) => println!("   ✗ Ben: sold out"),
        Err(e) => return Err(e.into()),
        Ok(ticket_id) => println!("   ? Ben unexpectedly got {ticket_id}"),
    }

    println!("\n🧾 Receipt\n{}\n", app.tickets.receipt(&ticket_id).await?);

    println!("📊 Metrics\n{}", prometheus.render());
    Ok(())
}

fn registration(email: &str, username: &str, role: &str) -> RawRegistrationForm {
    RawRegistrationForm {
        email: email.to_string(),
        password: "correct horse".to_string(),
        confirm_password: "correct horse".to_string(),
        first_name: username.to_string(),
        last_name: "Demo".to_string(),
        username: username.to_string(),
        birth_date: String::new(),
        role: role.to_string(),
    }
}
