//! Human review of extracted deals.
//!
//! Each user owns one [`ReviewSession`]: an ordered list of deals, a status
//! per deal and at most one pending field edit. Sessions live in a
//! [`SessionStore`]; approved deals leave through a [`CommitSink`]. The
//! `render` functions turn a session into text plus the actions a transport
//! should offer, and [`ReviewAction`] is the compact form those actions
//! travel back in.

mod actions;
mod commit;
mod render;
mod session;
mod store;

pub use actions::*;
pub use commit::*;
pub use render::*;
pub use session::*;
pub use store::*;

use thiserror::Error;

use crate::models::FieldName;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Deal {index} is out of range (session has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No field edit is pending")]
    NoPendingEdit,

    #[error("Invalid {field}: {reason}. Expected {expected}")]
    InvalidEditInput {
        field: FieldName,
        reason: String,
        expected: &'static str,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unrecognized action: {0}")]
    InvalidAction(String),

    #[error("No approved deals to commit")]
    NothingApproved,

    #[error("Commit failed for {failed} of {total} deals")]
    CommitFailed { failed: usize, total: usize },

    #[error("Commit sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Session is already closed")]
    SessionClosed,

    #[error("Session store lock poisoned")]
    LockPoisoned,
}
