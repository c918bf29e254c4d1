//! Business metrics for Evently.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `evently_events_created_total` - Total events created
//! - `evently_events_deleted_total` - Total events deleted
//! - `evently_tickets_issued_total` - Total tickets issued
//! - `evently_ticket_rejections_total{reason}` - Purchases refused (`capacity_exceeded`, `not_found`, `payment`, ...)
//! - `evently_comments_total{kind}` - Comments and replies posted (`comment`, `reply`)
//! - `evently_attendance_changes_total{change}` - Attendance changes (`join`, `leave`)
//! - `evently_accounts_total{outcome}` - Registrations and sign-ins (`registered`, `signed_in`)
//!
//! ## Histograms
//! - `evently_store_commit_duration_seconds` - Batch commit latency (`PostgreSQL` store)

use metrics::{describe_counter, describe_histogram};

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!("evently_events_created_total", "Total number of events created");
    describe_counter!("evently_events_deleted_total", "Total number of events deleted");

    describe_counter!("evently_tickets_issued_total", "Total number of tickets issued");
    describe_counter!(
        "evently_ticket_rejections_total",
        "Ticket purchases refused, by reason"
    );

    describe_counter!(
        "evently_comments_total",
        "Comments and replies posted, by kind (comment, reply)"
    );
    describe_counter!(
        "evently_attendance_changes_total",
        "Attendance changes, by change (join, leave)"
    );
    describe_counter!(
        "evently_accounts_total",
        "Account operations, by outcome (registered, signed_in)"
    );

    describe_histogram!(
        "evently_store_commit_duration_seconds",
        "Time taken to commit a write batch"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record an event created.
pub fn record_event_created() {
    metrics::counter!("evently_events_created_total").increment(1);
    tracing::debug!("Recorded event_created metric");
}

/// Record an event deleted.
pub fn record_event_deleted() {
    metrics::counter!("evently_events_deleted_total").increment(1);
    tracing::debug!("Recorded event_deleted metric");
}

/// Record a ticket issued.
pub fn record_ticket_issued() {
    metrics::counter!("evently_tickets_issued_total").increment(1);
    tracing::debug!("Recorded ticket_issued metric");
}

/// Record a refused ticket purchase.
///
/// # Arguments
///
/// * `reason` - Error kind (e.g., `"capacity_exceeded"`, `"payment"`)
pub fn record_ticket_rejected(reason: &'static str) {
    metrics::counter!("evently_ticket_rejections_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded ticket_rejected metric");
}

/// Record a comment (`"comment"`) or reply (`"reply"`).
pub fn record_comment(kind: &'static str) {
    metrics::counter!("evently_comments_total", "kind" => kind).increment(1);
    tracing::debug!(kind, "Recorded comment metric");
}

/// Record an attendance change (`"join"` or `"leave"`).
pub fn record_attendance_change(change: &'static str) {
    metrics::counter!("evently_attendance_changes_total", "change" => change).increment(1);
    tracing::debug!(change, "Recorded attendance_change metric");
}

/// Record an account operation (`"registered"` or `"signed_in"`).
pub fn record_account(outcome: &'static str) {
    metrics::counter!("evently_accounts_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded account metric");
}
