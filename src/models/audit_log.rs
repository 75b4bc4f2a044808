use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Audit trail for admin ledger operations (credit adjustments, resets).
/// Written best-effort even when the primary operation fails.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Username of the acting admin (from the identity assertion)
    pub actor: String,
    pub action: String, // 'adjust_credit', 'reset_progress'
    pub subject_user_id: i32,
    pub before_state: Option<String>, // JSON snapshot
    pub after_state: Option<String>,  // JSON snapshot
    pub reason: String,
    pub outcome: String, // 'ok', 'failed'
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
