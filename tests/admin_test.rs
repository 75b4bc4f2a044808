//! Admin operation tests: credit adjustments with audit records, and the
//! progress reset as the one sanctioned way counters go down.

use lingopath::db;
use lingopath::domain::{ContentKind, LedgerError};
use lingopath::models::{audit_log, completed_item, user, user_progress, ContentItemDto};
use lingopath::services::admin::{self, CreditType, ResetFlags};
use lingopath::services::{content, progress, reward::RewardInput};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_user(db: &DatabaseConnection, username: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let account = user::ActiveModel {
        external_id: Set(format!("auth0|{}", username)),
        username: Set(username.to_string()),
        role: Set("user".to_string()),
        last_heart_regen_at: Set(now.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    user::Entity::insert(account)
        .exec(db)
        .await
        .expect("Failed to create user")
        .last_insert_id
}

async fn create_test_course(db: &DatabaseConnection) -> (i32, i32) {
    let lang = content::create_language(db, "ka", "Georgian")
        .await
        .expect("language");
    let chapter = content::create_item(
        db,
        ContentItemDto {
            kind: "chapter".to_string(),
            language_id: lang.id,
            parent_id: None,
            title: "Chapter 1".to_string(),
            xp_reward: None,
            gem_reward: None,
            gel_reward: None,
        },
    )
    .await
    .expect("chapter");
    let unit = content::create_item(
        db,
        ContentItemDto {
            kind: "unit".to_string(),
            language_id: lang.id,
            parent_id: Some(chapter.id),
            title: "Unit 1".to_string(),
            xp_reward: None,
            gem_reward: None,
            gel_reward: None,
        },
    )
    .await
    .expect("unit");
    let lesson = content::create_item(
        db,
        ContentItemDto {
            kind: "lesson".to_string(),
            language_id: lang.id,
            parent_id: Some(unit.id),
            title: "Lesson 1".to_string(),
            xp_reward: Some(10),
            gem_reward: None,
            gel_reward: None,
        },
    )
    .await
    .expect("lesson");
    (lang.id, lesson.id)
}

#[tokio::test]
async fn test_adjust_credit_returns_old_and_new_values() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "admin_target").await;

    let adj = admin::adjust_credit(&db, "admin|root", user_id, CreditType::Xp, 100, "contest prize")
        .await
        .expect("adjust");
    assert_eq!(adj.old_value, 0);
    assert_eq!(adj.new_value, 100);

    // Negative deltas are allowed for non-heart counters
    let adj = admin::adjust_credit(&db, "admin|root", user_id, CreditType::Xp, -30, "correction")
        .await
        .expect("adjust down");
    assert_eq!(adj.old_value, 100);
    assert_eq!(adj.new_value, 70);

    let entries = admin::list_audit(&db, 10).await.expect("audit");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, "adjust_credit");
    assert_eq!(entries[0].outcome, "ok");
    assert_eq!(entries[0].reason, "correction");
    assert!(entries[0].before_state.as_deref().unwrap().contains("100"));
    assert!(entries[0].after_state.as_deref().unwrap().contains("70"));
}

#[tokio::test]
async fn test_adjust_hearts_floors_at_zero() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "heartless").await;

    let adj = admin::adjust_credit(&db, "admin|root", user_id, CreditType::Hearts, -50, "penalty")
        .await
        .expect("adjust");
    assert_eq!(adj.old_value, 5);
    assert_eq!(adj.new_value, 0);
}

#[tokio::test]
async fn test_failed_adjustment_still_writes_audit() {
    let db = setup_test_db().await;

    let missing = admin::adjust_credit(&db, "admin|root", 9999, CreditType::Gems, 10, "typo").await;
    assert!(matches!(missing, Err(LedgerError::NotFound)));

    let entries = admin::list_audit(&db, 10).await.expect("audit");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].outcome, "failed");
    assert_eq!(entries[0].subject_user_id, 9999);
}

#[tokio::test]
async fn test_reset_progress_clears_selected_state_only() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "reset_me").await;
    let (language_id, lesson_id) = create_test_course(&db).await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start");
    progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        RewardInput {
            xp_base: 10,
            gems: 2,
            gel: 0,
        },
    )
    .await
    .expect("completion");

    // Clear completions but keep the earned counters
    admin::reset_progress(
        &db,
        "admin|root",
        user_id,
        ResetFlags {
            completions: true,
            ..Default::default()
        },
        "support ticket 4411",
    )
    .await
    .expect("reset");

    let progress_doc = user_progress::Entity::find()
        .filter(user_progress::Column::UserId.eq(user_id))
        .one(&db)
        .await
        .expect("query")
        .expect("progress survives the reset");
    let remaining = completed_item::Entity::find()
        .filter(completed_item::Column::ProgressId.eq(progress_doc.id))
        .all(&db)
        .await
        .expect("query");
    assert!(remaining.is_empty());

    let account = user::Entity::find_by_id(user_id)
        .one(&db)
        .await
        .expect("fetch")
        .expect("exists");
    assert_eq!(account.xp, 10, "counters untouched without the counters flag");

    // Now zero the counters too
    admin::reset_progress(
        &db,
        "admin|root",
        user_id,
        ResetFlags {
            counters: true,
            ..Default::default()
        },
        "support ticket 4411",
    )
    .await
    .expect("counter reset");
    let account = user::Entity::find_by_id(user_id)
        .one(&db)
        .await
        .expect("fetch")
        .expect("exists");
    assert_eq!(account.xp, 0);
    assert_eq!(account.gems, 0);
    assert_eq!(account.streak, 0);

    // Both resets carry an audit trail with a before snapshot
    let resets = audit_log::Entity::find()
        .filter(audit_log::Column::Action.eq("reset_progress"))
        .all(&db)
        .await
        .expect("audit");
    assert_eq!(resets.len(), 2);
    assert!(resets.iter().all(|e| e.outcome == "ok"));
    assert!(resets.iter().all(|e| e.before_state.is_some()));
}
