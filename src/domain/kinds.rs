//! Closed vocabularies shared between the models and the service layer.
//!
//! Columns store these as TEXT; the enums exist so state machines in the
//! services can match exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};

use super::LedgerError;

/// Discriminant for the generic content hierarchy (languages are the root and
/// live in their own table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Chapter,
    Unit,
    Lesson,
    Exercise,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Chapter => "chapter",
            ContentKind::Unit => "unit",
            ContentKind::Lesson => "lesson",
            ContentKind::Exercise => "exercise",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "chapter" => Ok(ContentKind::Chapter),
            "unit" => Ok(ContentKind::Unit),
            "lesson" => Ok(ContentKind::Lesson),
            "exercise" => Ok(ContentKind::Exercise),
            other => Err(LedgerError::Validation(format!(
                "unknown content kind '{}'",
                other
            ))),
        }
    }

    /// Expected kind of the parent item, None for top-level chapters.
    pub fn parent_kind(&self) -> Option<ContentKind> {
        match self {
            ContentKind::Chapter => None,
            ContentKind::Unit => Some(ContentKind::Chapter),
            ContentKind::Lesson => Some(ContentKind::Unit),
            ContentKind::Exercise => Some(ContentKind::Lesson),
        }
    }
}

/// Soft-delete state of a content entity. There is no hard delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Active,
    Disabled,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Active => "active",
            ContentStatus::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "active" => Ok(ContentStatus::Active),
            "disabled" => Ok(ContentStatus::Disabled),
            other => Err(LedgerError::Validation(format!(
                "unknown content status '{}'",
                other
            ))),
        }
    }
}

/// Lifecycle of a user's quest assignment. Transitions are forward-only
/// except via admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Assigned,
    Started,
    InProgress,
    Completed,
    Abandoned,
    Expired,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Assigned => "assigned",
            QuestStatus::Started => "started",
            QuestStatus::InProgress => "in_progress",
            QuestStatus::Completed => "completed",
            QuestStatus::Abandoned => "abandoned",
            QuestStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "assigned" => Ok(QuestStatus::Assigned),
            "started" => Ok(QuestStatus::Started),
            "in_progress" => Ok(QuestStatus::InProgress),
            "completed" => Ok(QuestStatus::Completed),
            "abandoned" => Ok(QuestStatus::Abandoned),
            "expired" => Ok(QuestStatus::Expired),
            other => Err(LedgerError::Validation(format!(
                "unknown quest status '{}'",
                other
            ))),
        }
    }

    /// Statuses whose condition counters still advance.
    pub fn is_advanceable(&self) -> bool {
        matches!(
            self,
            QuestStatus::Assigned | QuestStatus::Started | QuestStatus::InProgress
        )
    }
}

/// Counting window of a quest condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
    Total,
    Session,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
            Timeframe::Total => "total",
            Timeframe::Session => "session",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "daily" => Ok(Timeframe::Daily),
            "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            "total" => Ok(Timeframe::Total),
            "session" => Ok(Timeframe::Session),
            other => Err(LedgerError::Validation(format!(
                "unknown timeframe '{}'",
                other
            ))),
        }
    }
}
