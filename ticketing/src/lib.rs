//! Evently - event management and ticketing over a hosted document store.
//!
//! Organizers publish events (title, date, tags, capacity, photo); users
//! browse and search them, join or leave, discuss them in comment threads,
//! and purchase capacity-limited tickets.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────────┐
//!                 │               TicketingApp               │
//!                 │ EventCatalog  AttendanceLedger  Accounts │
//!                 │ CommentThreads            TicketOffice   │
//!                 └──────────────────────────────────────────┘
//!                    │            │            │          │
//!             DocumentStore   BlobStore   IdentityProvider  PaymentProcessor
//!           (memory/Postgres) (photos)      (accounts)      (card tokens)
//! ```
//!
//! Every mutating operation takes an explicit [`Session`]; there is no
//! ambient current user.
//!
//! # Ticket capacity
//!
//! A purchase commits the capacity decrement and the ticket record in one
//! batch guarded by `capacity > 0`. Concurrent purchases against capacity
//! `N` issue exactly `N` tickets:
//!
//! ```text
//! update events/{id}   if capacity > 0   capacity -= 1
//! create tickets/{new} { eventId, userId }
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ticketing::{Config, TicketingApp};
//!
//! let app = TicketingApp::in_memory(Config::from_env());
//! let session = app.accounts.sign_in("ana@example.com", "secret1").await?;
//! let ticket = app.tickets.issue_ticket(&session, &event_id).await?;
//! println!("{}", app.tickets.receipt(&ticket).await?);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod collections;
pub mod config;
pub mod error;
pub mod forms;
pub mod metrics;
pub mod payment;
pub mod services;
pub mod session;
pub mod types;

pub use app::{AppError, TicketingApp};
pub use config::Config;
pub use error::{Result, TicketingError};
pub use forms::{EventForm, FormError, ProfileForm, RawEventForm, RawProfileForm, RawRegistrationForm, RegistrationForm, SearchQuery};
pub use payment::{CardDetails, MockPaymentProcessor, PaymentError, PaymentProcessor};
pub use services::{Accounts, AttendanceLedger, CommentThreads, EventCatalog, PhotoUpload, TicketOffice};
pub use session::Session;
pub use types::*;
