//! Quest Counter - advances per-user quest condition counters and flips
//! assignment status exactly once on the threshold-crossing call.
//!
//! Quest rewards go through the same reward engine as lesson completions;
//! the one-shot status transition (advanceable -> completed inside a single
//! transaction) is what makes the credit at-most-once.

use chrono::{DateTime, Datelike, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Serialize;

use crate::domain::{LedgerError, QuestStatus, Timeframe};
use crate::models::{quest, quest_condition, user, user_quest, user_quest_condition};
use crate::services::reward::{self, RewardInput, XpBoost};
use crate::services::streak;

#[derive(Debug, Clone, Serialize)]
pub struct ConditionSnapshot {
    pub condition_type: String,
    pub timeframe: String,
    pub counter: i64,
    pub target: i64,
    pub met: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserQuestSnapshot {
    pub user_quest_id: i32,
    pub quest_id: i32,
    pub title: String,
    pub status: String,
    pub overall_progress: i32,
    pub completed_at: Option<String>,
    /// True only on the call that flipped the quest to completed
    pub completed_now: bool,
    pub conditions: Vec<ConditionSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct AdvanceOutcome {
    /// True when at least one quest completed on this call (the edge, never
    /// on subsequent reads)
    pub was_completed: bool,
    pub quests: Vec<UserQuestSnapshot>,
}

/// Start of the current counting window, user-local. Empty for timeframes
/// that never reset.
fn window_start(timeframe: Timeframe, today: chrono::NaiveDate) -> String {
    match timeframe {
        Timeframe::Daily => today.to_string(),
        Timeframe::Weekly => {
            (today - Duration::days(today.weekday().num_days_from_sunday() as i64)).to_string()
        }
        Timeframe::Monthly => today.with_day(1).unwrap_or(today).to_string(),
        Timeframe::Total | Timeframe::Session => String::new(),
    }
}

/// Assigns a quest to a user, creating the per-condition counter rows.
/// Re-assignment of the same quest is an idempotent no-op.
pub async fn assign_quest(
    db: &DatabaseConnection,
    user_id: i32,
    quest_id: i32,
) -> Result<UserQuestSnapshot, LedgerError> {
    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let quest_def = quest::Entity::find_by_id(quest_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    if quest_def.status != "active" {
        return Err(LedgerError::Validation("quest is disabled".to_string()));
    }

    let now = Utc::now();
    let assignment = match user_quest::Entity::find()
        .filter(user_quest::Column::UserId.eq(user_id))
        .filter(user_quest::Column::QuestId.eq(quest_id))
        .one(&txn)
        .await?
    {
        Some(existing) => existing,
        None => {
            let model = user_quest::ActiveModel {
                user_id: Set(user_id),
                quest_id: Set(quest_id),
                status: Set(QuestStatus::Assigned.as_str().to_string()),
                overall_progress: Set(0),
                assigned_at: Set(now.to_rfc3339()),
                created_at: Set(now.to_rfc3339()),
                updated_at: Set(now.to_rfc3339()),
                ..Default::default()
            };
            model.insert(&txn).await?
        }
    };

    let conditions = quest_condition::Entity::find()
        .filter(quest_condition::Column::QuestId.eq(quest_id))
        .all(&txn)
        .await?;

    let today = streak::local_date(now, account.timezone_offset_minutes);
    for cond in &conditions {
        ensure_counter(&txn, assignment.id, cond, today, now).await?;
    }

    let snapshot = snapshot_quest(&txn, &assignment, &quest_def, false).await?;
    txn.commit().await?;
    Ok(snapshot)
}

/// Ensures the counter row for (user_quest, condition) exists; returns it.
async fn ensure_counter<C: ConnectionTrait>(
    conn: &C,
    user_quest_id: i32,
    cond: &quest_condition::Model,
    today: chrono::NaiveDate,
    now: DateTime<Utc>,
) -> Result<user_quest_condition::Model, LedgerError> {
    if let Some(existing) = user_quest_condition::Entity::find()
        .filter(user_quest_condition::Column::UserQuestId.eq(user_quest_id))
        .filter(user_quest_condition::Column::ConditionId.eq(cond.id))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let timeframe = Timeframe::parse(&cond.timeframe)?;
    let model = user_quest_condition::ActiveModel {
        user_quest_id: Set(user_quest_id),
        condition_id: Set(cond.id),
        counter: Set(0),
        window_start: Set(window_start(timeframe, today)),
        updated_at: Set(now.to_rfc3339()),
        ..Default::default()
    };
    Ok(model.insert(conn).await?)
}

/// Public entry point: wraps the increment in its own transaction.
pub async fn advance_condition(
    db: &DatabaseConnection,
    user_id: i32,
    condition_type: &str,
    increment: i64,
) -> Result<AdvanceOutcome, LedgerError> {
    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let outcome = advance_condition_in(&txn, &account, condition_type, increment, Utc::now()).await?;
    txn.commit().await?;
    Ok(outcome)
}

/// Advances every advanceable quest of the user that carries a condition of
/// `condition_type`. Also callable from inside the completion transaction.
pub(crate) async fn advance_condition_in<C: ConnectionTrait>(
    conn: &C,
    account: &user::Model,
    condition_type: &str,
    increment: i64,
    now: DateTime<Utc>,
) -> Result<AdvanceOutcome, LedgerError> {
    if increment <= 0 {
        return Err(LedgerError::Validation(
            "increment_value must be positive".to_string(),
        ));
    }
    if condition_type.trim().is_empty() {
        return Err(LedgerError::Validation(
            "condition_type must not be empty".to_string(),
        ));
    }

    let assignments = user_quest::Entity::find()
        .filter(user_quest::Column::UserId.eq(account.id))
        .all(conn)
        .await?;

    let today = streak::local_date(now, account.timezone_offset_minutes);
    let mut quests = Vec::new();
    let mut was_completed = false;

    for assignment in assignments {
        let status = QuestStatus::parse(&assignment.status)?;
        if !status.is_advanceable() {
            continue;
        }

        let conditions = quest_condition::Entity::find()
            .filter(quest_condition::Column::QuestId.eq(assignment.quest_id))
            .all(conn)
            .await?;

        if !conditions.iter().any(|c| c.condition_type == condition_type) {
            continue;
        }

        let quest_def = quest::Entity::find_by_id(assignment.quest_id)
            .one(conn)
            .await?
            .ok_or(LedgerError::NotFound)?;

        let mut met_count = 0usize;
        for cond in &conditions {
            let counter_row = ensure_counter(conn, assignment.id, cond, today, now).await?;
            let timeframe = Timeframe::parse(&cond.timeframe)?;
            let current_window = window_start(timeframe, today);

            let mut counter = counter_row.counter;
            let mut window = counter_row.window_start.clone();

            // Daily/weekly/monthly counters restart when the window rolls over
            if window != current_window {
                counter = 0;
                window = current_window;
            }

            if cond.condition_type == condition_type {
                counter += increment;
            }

            if counter != counter_row.counter || window != counter_row.window_start {
                let mut active: user_quest_condition::ActiveModel = counter_row.clone().into();
                active.counter = Set(counter);
                active.window_start = Set(window);
                active.updated_at = Set(now.to_rfc3339());
                active.update(conn).await?;
            }

            if counter >= cond.target {
                met_count += 1;
            }
        }

        let overall = if conditions.is_empty() {
            0
        } else {
            (met_count * 100 / conditions.len()) as i32
        };

        let all_met = !conditions.is_empty() && met_count == conditions.len();
        let new_status = if all_met {
            QuestStatus::Completed
        } else {
            // First increment moves a freshly assigned quest into progress
            match status {
                QuestStatus::Assigned => QuestStatus::InProgress,
                other => other,
            }
        };

        let completed_now = all_met && status != QuestStatus::Completed;

        let mut active: user_quest::ActiveModel = assignment.clone().into();
        active.status = Set(new_status.as_str().to_string());
        active.overall_progress = Set(overall);
        active.updated_at = Set(now.to_rfc3339());
        if completed_now {
            // Set exactly once; the status guard keeps it immutable after
            active.completed_at = Set(Some(now.to_rfc3339()));
        }
        let updated = active.update(conn).await?;

        if completed_now {
            // At-most-once: this branch is only reachable on the transition
            // edge, inside the same transaction as the status flip.
            let amounts = reward::compute_reward(
                RewardInput {
                    xp_base: quest_def.xp_reward,
                    gems: quest_def.gem_reward,
                    gel: quest_def.gel_reward,
                },
                XpBoost::from_user(account),
                now,
            )?;
            reward::credit_user(conn, account.id, &amounts).await?;
            was_completed = true;
            tracing::info!(
                user_id = account.id,
                quest_id = quest_def.id,
                "quest completed, rewards credited"
            );
        }

        quests.push(snapshot_quest(conn, &updated, &quest_def, completed_now).await?);
    }

    Ok(AdvanceOutcome {
        was_completed,
        quests,
    })
}

async fn snapshot_quest<C: ConnectionTrait>(
    conn: &C,
    assignment: &user_quest::Model,
    quest_def: &quest::Model,
    completed_now: bool,
) -> Result<UserQuestSnapshot, LedgerError> {
    let conditions = quest_condition::Entity::find()
        .filter(quest_condition::Column::QuestId.eq(quest_def.id))
        .all(conn)
        .await?;

    let counters = user_quest_condition::Entity::find()
        .filter(user_quest_condition::Column::UserQuestId.eq(assignment.id))
        .all(conn)
        .await?;

    let conditions = conditions
        .into_iter()
        .map(|cond| {
            let counter = counters
                .iter()
                .find(|c| c.condition_id == cond.id)
                .map(|c| c.counter)
                .unwrap_or(0);
            ConditionSnapshot {
                condition_type: cond.condition_type,
                timeframe: cond.timeframe,
                counter,
                target: cond.target,
                met: counter >= cond.target,
            }
        })
        .collect();

    Ok(UserQuestSnapshot {
        user_quest_id: assignment.id,
        quest_id: quest_def.id,
        title: quest_def.title.clone(),
        status: assignment.status.clone(),
        overall_progress: assignment.overall_progress,
        completed_at: assignment.completed_at.clone(),
        completed_now,
        conditions,
    })
}

/// All quest assignments of a user, for the client's quest screen.
pub async fn list_user_quests(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<UserQuestSnapshot>, LedgerError> {
    let assignments = user_quest::Entity::find()
        .filter(user_quest::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let mut out = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let quest_def = quest::Entity::find_by_id(assignment.quest_id)
            .one(db)
            .await?
            .ok_or(LedgerError::NotFound)?;
        out.push(snapshot_quest(db, &assignment, &quest_def, false).await?);
    }
    Ok(out)
}
