pub mod errors;
pub mod kinds;

pub use errors::{is_unique_violation, LedgerError};
pub use kinds::{ContentKind, ContentStatus, QuestStatus, Timeframe};
