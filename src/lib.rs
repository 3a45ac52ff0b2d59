//! In-memory debouncing pool for calendar change notifications.
//!
//! Rapid edits to the same appointment collapse into at most one outgoing
//! notification per recipient per flush window instead of one per edit.
//! Mutation code calls [`NotificationPool::enqueue`] (or
//! [`NotificationPool::fast_track`] / [`NotificationPool::drop_pending`])
//! synchronously; a background [`sweeper`] task drives the periodic flush.
//! Mail rendering and transport live behind the [`mailer`] traits.
//!
//! Best-effort by design: no delivery guarantees, no persistence across
//! restart.

pub mod clock;
pub mod config;
pub mod mailer;
pub mod model;
pub mod observability;
pub mod pool;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PoolConfig;
pub use mailer::{Mail, MailError, MailGenerator, MailGeneratorFactory, MailSender, Recipient};
pub use model::{
    Appointment, AppointmentId, ContextId, Ms, Participant, PendingChange, PoolKey, Session, Span,
    UserId,
};
pub use pool::NotificationPool;
pub use sweeper::{run_sweeper, spawn_sweeper};
