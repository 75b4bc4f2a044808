//! Progress Store - hierarchical completion state per (user, language).
//!
//! `record_completion` is the atomic unit of the whole ledger: membership
//! check, reward credit, completion record, activity event and streak cache
//! all commit or roll back together. The membership check is not application
//! code at all; it is the UNIQUE(progress_id, item_kind, item_id) index, so
//! two concurrent requests can never both pass it.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{is_unique_violation, ContentKind, ContentStatus, LedgerError};
use crate::models::{activity_log, completed_item, content_item, language, user, user_progress};
use crate::services::quest;
use crate::services::reward::{self, RewardAmounts, RewardInput, XpBoost};
use crate::services::streak;

/// The closed set of value-trait keys. Updates outside this set are dropped.
pub const VALUE_POINT_KEYS: [&str; 6] = [
    "patience",
    "gratitude",
    "courage",
    "kindness",
    "discipline",
    "curiosity",
];

/// Condition types the ledger feeds automatically on completion events.
pub const CONDITION_COMPLETE_LESSONS: &str = "complete_lessons";
pub const CONDITION_COMPLETE_EXERCISES: &str = "complete_exercises";
pub const CONDITION_EARN_XP: &str = "earn_xp";

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub progress_id: i32,
    pub user_id: i32,
    pub language_id: i32,
    pub xp: i64,
    pub gems: i64,
    pub gel: i64,
    pub hearts: i32,
    pub streak: i32,
    pub completed_chapters: u64,
    pub completed_units: u64,
    pub completed_lessons: u64,
    pub completed_exercises: u64,
}

#[derive(Debug, Serialize)]
pub struct CompletionOutcome {
    /// True when the item had already been credited; the rest of the outcome
    /// then reflects the original completion, untouched
    pub already_completed: bool,
    pub credited: RewardAmounts,
    pub record: completed_item::Model,
    pub snapshot: ProgressSnapshot,
    pub quest_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentLesson {
    pub lesson_id: i32,
    pub progress: f64,
    pub last_accessed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnitProgressView {
    pub unit_id: i32,
    pub title: String,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub percent_complete: f64,
}

#[derive(Debug, Serialize)]
pub struct ChapterProgressView {
    pub chapter_id: i32,
    pub title: String,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub percent_complete: f64,
    pub units: Vec<UnitProgressView>,
}

#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub snapshot: ProgressSnapshot,
    pub current_lesson: Option<CurrentLesson>,
    pub value_points: BTreeMap<String, i64>,
    pub chapters: Vec<ChapterProgressView>,
    pub completed_items: Vec<completed_item::Model>,
    pub streak: streak::StreakView,
}

#[derive(Debug, Serialize)]
pub struct ValuePointsView {
    pub language_id: i32,
    pub value_points: BTreeMap<String, i64>,
}

/// Lazily creates the progress document for (user, language). Idempotent:
/// an existing document is returned as-is.
pub async fn start_learning(
    db: &DatabaseConnection,
    user_id: i32,
    language_id: i32,
) -> Result<ProgressSnapshot, LedgerError> {
    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let lang = language::Entity::find_by_id(language_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;
    if ContentStatus::parse(&lang.status)? != ContentStatus::Active {
        return Err(LedgerError::Validation("language is disabled".to_string()));
    }

    let progress = match find_progress(&txn, user_id, language_id).await? {
        Some(existing) => existing,
        None => {
            let now = Utc::now().to_rfc3339();
            let model = user_progress::ActiveModel {
                user_id: Set(user_id),
                language_id: Set(language_id),
                current_lesson_progress: Set(0.0),
                value_points: Set("{}".to_string()),
                archived: Set(false),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            };
            match model.insert(&txn).await {
                Ok(created) => created,
                // Lost a creation race; the winner's row is what we wanted
                Err(e) if is_unique_violation(&e) => find_progress(&txn, user_id, language_id)
                    .await?
                    .ok_or_else(|| LedgerError::Conflict("progress creation race".to_string()))?,
                Err(e) => return Err(e.into()),
            }
        }
    };

    let snapshot = build_snapshot(&txn, &account, &progress).await?;
    txn.commit().await?;
    Ok(snapshot)
}

async fn find_progress<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    language_id: i32,
) -> Result<Option<user_progress::Model>, LedgerError> {
    Ok(user_progress::Entity::find()
        .filter(user_progress::Column::UserId.eq(user_id))
        .filter(user_progress::Column::LanguageId.eq(language_id))
        .one(conn)
        .await?)
}

/// Records a completion and credits its rewards, exactly once per item.
///
/// A duplicate call (retry or concurrent double-submit) is NOT an error: it
/// returns the original record with `already_completed = true` and credits
/// nothing.
pub async fn record_completion(
    db: &DatabaseConnection,
    user_id: i32,
    language_id: i32,
    item_kind: ContentKind,
    item_id: i32,
    input: RewardInput,
) -> Result<CompletionOutcome, LedgerError> {
    input.validate()?;

    let txn = db.begin().await?;

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let progress = find_progress(&txn, user_id, language_id)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let item = content_item::Entity::find_by_id(item_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;
    if item.language_id != language_id || item.kind != item_kind.as_str() {
        return Err(LedgerError::NotFound);
    }
    if ContentStatus::parse(&item.status)? != ContentStatus::Active {
        return Err(LedgerError::Validation(
            "content item is disabled".to_string(),
        ));
    }

    let now = Utc::now();
    let amounts = reward::compute_reward(input, XpBoost::from_user(&account), now)?;

    let record = completed_item::ActiveModel {
        progress_id: Set(progress.id),
        item_kind: Set(item_kind.as_str().to_string()),
        item_id: Set(item_id),
        xp: Set(amounts.xp),
        gems: Set(amounts.gems),
        gel: Set(amounts.gel),
        boost_multiplier: Set(amounts.boost_multiplier),
        completed_at: Set(now.to_rfc3339()),
        ..Default::default()
    };

    let record = match record.insert(&txn).await {
        Ok(created) => created,
        Err(e) if is_unique_violation(&e) => {
            // Already credited by an earlier (or concurrent) request.
            // Return the prior state untouched; retries are not punished.
            let existing = completed_item::Entity::find()
                .filter(completed_item::Column::ProgressId.eq(progress.id))
                .filter(completed_item::Column::ItemKind.eq(item_kind.as_str()))
                .filter(completed_item::Column::ItemId.eq(item_id))
                .one(&txn)
                .await?
                .ok_or_else(|| LedgerError::Conflict("completion record vanished".to_string()))?;

            let snapshot = build_snapshot(&txn, &account, &progress).await?;
            txn.commit().await?;
            tracing::debug!(
                user_id,
                item_id,
                kind = item_kind.as_str(),
                "duplicate completion ignored"
            );
            return Ok(CompletionOutcome {
                already_completed: true,
                credited: RewardAmounts {
                    xp: 0,
                    gems: 0,
                    gel: 0,
                    boost_multiplier: None,
                },
                record: existing,
                snapshot,
                quest_completed: false,
            });
        }
        Err(e) => return Err(e.into()),
    };

    reward::credit_user(&txn, user_id, &amounts).await?;

    // Activity event feeds the streak derivation
    let event = activity_log::ActiveModel {
        user_id: Set(user_id),
        kind: Set("completion".to_string()),
        occurred_at: Set(now.to_rfc3339()),
        ..Default::default()
    };
    event.insert(&txn).await?;

    streak::recompute_streak(&txn, &account, now).await?;

    // Notify the quest counter inside the same transaction
    let mut quest_completed = false;
    let lesson_like = match item_kind {
        ContentKind::Lesson => Some(CONDITION_COMPLETE_LESSONS),
        ContentKind::Exercise => Some(CONDITION_COMPLETE_EXERCISES),
        ContentKind::Chapter | ContentKind::Unit => None,
    };
    if let Some(condition_type) = lesson_like {
        let outcome = quest::advance_condition_in(&txn, &account, condition_type, 1, now).await?;
        quest_completed |= outcome.was_completed;
    }
    if amounts.xp > 0 {
        let outcome =
            quest::advance_condition_in(&txn, &account, CONDITION_EARN_XP, amounts.xp, now).await?;
        quest_completed |= outcome.was_completed;
    }

    let snapshot = build_snapshot(&txn, &account, &progress).await?;
    txn.commit().await?;

    tracing::info!(
        user_id,
        language_id,
        item_id,
        kind = item_kind.as_str(),
        xp = amounts.xp,
        "completion recorded"
    );

    Ok(CompletionOutcome {
        already_completed: false,
        credited: amounts,
        record,
        snapshot,
        quest_completed,
    })
}

/// Re-reads user totals and completion counts; used to close every mutation.
async fn build_snapshot<C: ConnectionTrait>(
    conn: &C,
    account: &user::Model,
    progress: &user_progress::Model,
) -> Result<ProgressSnapshot, LedgerError> {
    use sea_orm::PaginatorTrait;

    // Totals may have changed within the transaction
    let account = user::Entity::find_by_id(account.id)
        .one(conn)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let count_kind = |kind: &'static str| {
        completed_item::Entity::find()
            .filter(completed_item::Column::ProgressId.eq(progress.id))
            .filter(completed_item::Column::ItemKind.eq(kind))
            .count(conn)
    };

    Ok(ProgressSnapshot {
        progress_id: progress.id,
        user_id: account.id,
        language_id: progress.language_id,
        xp: account.xp,
        gems: account.gems,
        gel: account.gel,
        hearts: account.hearts,
        streak: account.streak,
        completed_chapters: count_kind("chapter").await?,
        completed_units: count_kind("unit").await?,
        completed_lessons: count_kind("lesson").await?,
        completed_exercises: count_kind("exercise").await?,
    })
}

/// Read-only projection: completed sets, current lesson pointer and
/// per-chapter/unit aggregates. No mutation.
pub async fn get_progress(
    db: &DatabaseConnection,
    user_id: i32,
    language_id: i32,
) -> Result<ProgressView, LedgerError> {
    let account = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let progress = find_progress(db, user_id, language_id)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let completed = completed_item::Entity::find()
        .filter(completed_item::Column::ProgressId.eq(progress.id))
        .all(db)
        .await?;

    let completed_lesson_ids: Vec<i32> = completed
        .iter()
        .filter(|c| c.item_kind == "lesson")
        .map(|c| c.item_id)
        .collect();

    let items = content_item::Entity::find()
        .filter(content_item::Column::LanguageId.eq(language_id))
        .filter(content_item::Column::Status.eq(ContentStatus::Active.as_str()))
        .all(db)
        .await?;

    let chapters = aggregate_chapters(&items, &completed_lesson_ids);

    let value_points: BTreeMap<String, i64> =
        serde_json::from_str(&progress.value_points).unwrap_or_default();

    let current_lesson = progress.current_lesson_id.map(|lesson_id| CurrentLesson {
        lesson_id,
        progress: progress.current_lesson_progress,
        last_accessed: progress.current_lesson_accessed_at.clone(),
    });

    let snapshot = build_snapshot(db, &account, &progress).await?;
    let streak = streak::streak_view(db, user_id).await?;

    Ok(ProgressView {
        snapshot,
        current_lesson,
        value_points,
        chapters,
        completed_items: completed,
        streak,
    })
}

/// Percent-complete rollups, lessons being the unit of completion.
fn aggregate_chapters(
    items: &[content_item::Model],
    completed_lesson_ids: &[i32],
) -> Vec<ChapterProgressView> {
    let mut chapters: Vec<ChapterProgressView> = Vec::new();

    let mut chapter_items: Vec<&content_item::Model> =
        items.iter().filter(|i| i.kind == "chapter").collect();
    chapter_items.sort_by_key(|c| c.position);

    for chapter in chapter_items {
        let mut units: Vec<UnitProgressView> = Vec::new();
        let mut unit_items: Vec<&content_item::Model> = items
            .iter()
            .filter(|i| i.kind == "unit" && i.parent_id == Some(chapter.id))
            .collect();
        unit_items.sort_by_key(|u| u.position);

        for unit in unit_items {
            let lessons: Vec<&content_item::Model> = items
                .iter()
                .filter(|i| i.kind == "lesson" && i.parent_id == Some(unit.id))
                .collect();
            let done = lessons
                .iter()
                .filter(|l| completed_lesson_ids.contains(&l.id))
                .count();
            units.push(UnitProgressView {
                unit_id: unit.id,
                title: unit.title.clone(),
                total_lessons: lessons.len(),
                completed_lessons: done,
                percent_complete: percent(done, lessons.len()),
            });
        }

        let total: usize = units.iter().map(|u| u.total_lessons).sum();
        let done: usize = units.iter().map(|u| u.completed_lessons).sum();
        chapters.push(ChapterProgressView {
            chapter_id: chapter.id,
            title: chapter.title.clone(),
            total_lessons: total,
            completed_lessons: done,
            percent_complete: percent(done, total),
            units,
        });
    }

    chapters
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

/// Overwrites the single current-lesson pointer.
pub async fn set_current_lesson(
    db: &DatabaseConnection,
    user_id: i32,
    language_id: i32,
    lesson_id: i32,
    lesson_progress: f64,
) -> Result<CurrentLesson, LedgerError> {
    if !(0.0..=1.0).contains(&lesson_progress) {
        return Err(LedgerError::Validation(
            "progress must be between 0 and 1".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let progress = find_progress(&txn, user_id, language_id)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let lesson = content_item::Entity::find_by_id(lesson_id)
        .one(&txn)
        .await?
        .ok_or(LedgerError::NotFound)?;
    if lesson.kind != ContentKind::Lesson.as_str() || lesson.language_id != language_id {
        return Err(LedgerError::NotFound);
    }

    let now = Utc::now().to_rfc3339();
    let mut active: user_progress::ActiveModel = progress.into();
    active.current_lesson_id = Set(Some(lesson_id));
    active.current_lesson_progress = Set(lesson_progress);
    active.current_lesson_accessed_at = Set(Some(now.clone()));
    active.updated_at = Set(now.clone());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(CurrentLesson {
        lesson_id,
        progress: lesson_progress,
        last_accessed: Some(now),
    })
}

/// Merges value-point deltas by addition. Unknown keys are silently dropped;
/// an update with no recognized key at all is rejected.
///
/// The merge happens on the single progress row inside a transaction, so a
/// concurrent lesson completion cannot clobber it (different columns, same
/// row-level serialization).
pub async fn update_value_points(
    db: &DatabaseConnection,
    user_id: i32,
    language_id: i32,
    updates: &BTreeMap<String, i64>,
) -> Result<ValuePointsView, LedgerError> {
    let recognized: BTreeMap<&str, i64> = updates
        .iter()
        .filter(|(k, _)| VALUE_POINT_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), *v))
        .collect();

    if recognized.is_empty() {
        return Err(LedgerError::Validation(
            "no recognized value point keys in update".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let progress = find_progress(&txn, user_id, language_id)
        .await?
        .ok_or(LedgerError::NotFound)?;

    let mut points: BTreeMap<String, i64> =
        serde_json::from_str(&progress.value_points).unwrap_or_default();
    for (key, delta) in &recognized {
        *points.entry(key.to_string()).or_insert(0) += delta;
    }

    let serialized = serde_json::to_string(&points)
        .map_err(|e| LedgerError::Storage(format!("value points serialization: {}", e)))?;

    let mut active: user_progress::ActiveModel = progress.into();
    active.value_points = Set(serialized);
    active.updated_at = Set(Utc::now().to_rfc3339());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(ValuePointsView {
        language_id,
        value_points: points,
    })
}

/// Appends a login event to the audit trail. Feeds activity analytics, not
/// the streak (completion-based policy).
pub async fn record_login(db: &DatabaseConnection, user_id: i32) -> Result<(), LedgerError> {
    let event = activity_log::ActiveModel {
        user_id: Set(user_id),
        kind: Set("login".to_string()),
        occurred_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    };
    event.insert(db).await?;
    Ok(())
}
