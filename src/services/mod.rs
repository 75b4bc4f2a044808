//! Services Layer
//!
//! Pure ledger logic extracted from HTTP handlers. Every invariant of the
//! progress/reward state machine lives here; the API layer is translation
//! only.

pub mod admin;
pub mod content;
pub mod progress;
pub mod quest;
pub mod reward;
pub mod streak;
