//! Admin ledger operations: credit adjustments and progress resets.
//!
//! These bypass the idempotency guard by design and therefore always leave an
//! audit record with before/after state, best-effort even when the primary
//! operation fails partway.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::LedgerError;
use crate::models::{audit_log, completed_item, user, user_progress, user_quest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditType {
    Xp,
    Gems,
    Gel,
    Hearts,
}

impl CreditType {
    fn column(&self) -> &'static str {
        match self {
            CreditType::Xp => "xp",
            CreditType::Gems => "gems",
            CreditType::Gel => "gel",
            CreditType::Hearts => "hearts",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreditAdjustment {
    pub credit_type: CreditType,
    pub old_value: i64,
    pub new_value: i64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ResetFlags {
    #[serde(default)]
    pub completions: bool,
    #[serde(default)]
    pub value_points: bool,
    #[serde(default)]
    pub quests: bool,
    #[serde(default)]
    pub counters: bool,
}

fn field_of(account: &user::Model, credit_type: CreditType) -> i64 {
    match credit_type {
        CreditType::Xp => account.xp,
        CreditType::Gems => account.gems,
        CreditType::Gel => account.gel,
        CreditType::Hearts => i64::from(account.hearts),
    }
}

async fn write_audit(
    db: &DatabaseConnection,
    actor: &str,
    action: &str,
    subject_user_id: i32,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    reason: &str,
    outcome: &str,
) {
    let entry = audit_log::ActiveModel {
        actor: Set(actor.to_string()),
        action: Set(action.to_string()),
        subject_user_id: Set(subject_user_id),
        before_state: Set(before.map(|v| v.to_string())),
        after_state: Set(after.map(|v| v.to_string())),
        reason: Set(reason.to_string()),
        outcome: Set(outcome.to_string()),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    // Best-effort: the audit trail must not mask the primary result
    if let Err(e) = entry.insert(db).await {
        tracing::error!("failed to write audit record: {}", e);
    }
}

/// Adjusts one account counter by a signed amount. Hearts floor at zero;
/// the other counters accept any resulting value an admin asks for.
pub async fn adjust_credit(
    db: &DatabaseConnection,
    actor: &str,
    user_id: i32,
    credit_type: CreditType,
    amount: i64,
    reason: &str,
) -> Result<CreditAdjustment, LedgerError> {
    let result = adjust_credit_inner(db, user_id, credit_type, amount).await;

    match &result {
        Ok(adj) => {
            write_audit(
                db,
                actor,
                "adjust_credit",
                user_id,
                Some(json!({ credit_type.column(): adj.old_value })),
                Some(json!({ credit_type.column(): adj.new_value })),
                reason,
                "ok",
            )
            .await;
        }
        Err(e) => {
            write_audit(
                db,
                actor,
                "adjust_credit",
                user_id,
                None,
                Some(json!({ "error": e.to_string(), "amount": amount })),
                reason,
                "failed",
            )
            .await;
        }
    }

    result
}

async fn adjust_credit_inner(
    db: &DatabaseConnection,
    user_id: i32,
    credit_type: CreditType,
    amount: i64,
) -> Result<CreditAdjustment, LedgerError> {
    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;
    let old_value = field_of(&account, credit_type);

    let column = credit_type.column();
    let sql = if credit_type == CreditType::Hearts {
        format!(
            "UPDATE users SET {c} = MAX({c} + ?, 0), updated_at = ? WHERE id = ?",
            c = column
        )
    } else {
        format!(
            "UPDATE users SET {c} = {c} + ?, updated_at = ? WHERE id = ?",
            c = column
        )
    };
    txn.execute(Statement::from_sql_and_values(
        txn.get_database_backend(),
        &sql,
        [amount.into(), Utc::now().to_rfc3339().into(), user_id.into()],
    ))
    .await?;

    let updated = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;
    let new_value = field_of(&updated, credit_type);

    txn.commit().await?;
    Ok(CreditAdjustment {
        credit_type,
        old_value,
        new_value,
    })
}

/// Destructive: selectively clears a user's ledger state per flags.
/// The only sanctioned way completion counts ever go down.
pub async fn reset_progress(
    db: &DatabaseConnection,
    actor: &str,
    user_id: i32,
    flags: ResetFlags,
    reason: &str,
) -> Result<(), LedgerError> {
    let result = reset_progress_inner(db, user_id, flags).await;

    let flags_json = json!({
        "completions": flags.completions,
        "value_points": flags.value_points,
        "quests": flags.quests,
        "counters": flags.counters,
    });
    match &result {
        Ok(before) => {
            write_audit(
                db,
                actor,
                "reset_progress",
                user_id,
                Some(before.clone()),
                Some(flags_json),
                reason,
                "ok",
            )
            .await;
        }
        Err(e) => {
            write_audit(
                db,
                actor,
                "reset_progress",
                user_id,
                None,
                Some(json!({ "error": e.to_string(), "flags": flags_json })),
                reason,
                "failed",
            )
            .await;
        }
    }

    result.map(|_| ())
}

async fn reset_progress_inner(
    db: &DatabaseConnection,
    user_id: i32,
    flags: ResetFlags,
) -> Result<serde_json::Value, LedgerError> {
    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let progress_ids: Vec<i32> = user_progress::Entity::find()
        .filter(user_progress::Column::UserId.eq(user_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let before = json!({
        "xp": account.xp,
        "gems": account.gems,
        "gel": account.gel,
        "hearts": account.hearts,
        "streak": account.streak,
        "progress_documents": progress_ids.len(),
    });

    if flags.completions && !progress_ids.is_empty() {
        completed_item::Entity::delete_many()
            .filter(completed_item::Column::ProgressId.is_in(progress_ids.clone()))
            .exec(&txn)
            .await?;
    }

    if flags.value_points && !progress_ids.is_empty() {
        txn.execute(Statement::from_sql_and_values(
            txn.get_database_backend(),
            "UPDATE user_progress SET value_points = '{}', updated_at = ? WHERE user_id = ?",
            [Utc::now().to_rfc3339().into(), user_id.into()],
        ))
        .await?;
    }

    if flags.quests {
        user_quest::Entity::delete_many()
            .filter(user_quest::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
    }

    if flags.counters {
        txn.execute(Statement::from_sql_and_values(
            txn.get_database_backend(),
            "UPDATE users SET xp = 0, gems = 0, gel = 0, streak = 0, updated_at = ? WHERE id = ?",
            [Utc::now().to_rfc3339().into(), user_id.into()],
        ))
        .await?;
    }

    txn.commit().await?;
    tracing::warn!(user_id, "admin progress reset applied");
    Ok(before)
}

/// Most recent audit entries, newest first.
pub async fn list_audit(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<audit_log::Model>, LedgerError> {
    Ok(audit_log::Entity::find()
        .order_by_desc(audit_log::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}
