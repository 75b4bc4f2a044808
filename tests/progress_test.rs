//! Progress ledger integration tests: idempotent completion crediting,
//! monotonic completion counts, value-point filtering and the concurrent
//! double-submit race.

use lingopath::db;
use lingopath::domain::{ContentKind, LedgerError};
use lingopath::models::{completed_item, user, ContentItemDto};
use lingopath::services::{content, progress, reward::RewardInput};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::collections::BTreeMap;

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

// Helper to create a test user
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
    let res = user::Entity::insert(account)
        .exec(db)
        .await
        .expect("Failed to create user");
    res.last_insert_id
}

// Helper to create a language with one chapter > unit > lesson chain.
// Returns (language_id, lesson_id).
async fn create_test_course(db: &DatabaseConnection, code: &str) -> (i32, i32) {
    let lang = content::create_language(db, code, "Test Language")
        .await
        .expect("Failed to create language");
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
    .expect("Failed to create chapter");
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
    .expect("Failed to create unit");
    let lesson = content::create_item(
        db,
        ContentItemDto {
            kind: "lesson".to_string(),
            language_id: lang.id,
            parent_id: Some(unit.id),
            title: "Lesson 1".to_string(),
            xp_reward: Some(10),
            gem_reward: Some(2),
            gel_reward: None,
        },
    )
    .await
    .expect("Failed to create lesson");
    (lang.id, lesson.id)
}

fn lesson_reward() -> RewardInput {
    RewardInput {
        xp_base: 10,
        gems: 2,
        gel: 1,
    }
}

#[tokio::test]
async fn test_start_learning_is_lazy_and_idempotent() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "ana").await;
    let (language_id, _) = create_test_course(&db, "ka").await;

    let first = progress::start_learning(&db, user_id, language_id)
        .await
        .expect("Failed to start learning");
    let second = progress::start_learning(&db, user_id, language_id)
        .await
        .expect("Second start should be a no-op");

    assert_eq!(first.progress_id, second.progress_id);
    assert_eq!(second.completed_lessons, 0);
}

#[tokio::test]
async fn test_completion_credits_rewards_once() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "beka").await;
    let (language_id, lesson_id) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    let first = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        lesson_reward(),
    )
    .await
    .expect("first completion");

    assert!(!first.already_completed);
    assert_eq!(first.credited.xp, 10);
    assert_eq!(first.snapshot.xp, 10);
    assert_eq!(first.snapshot.gems, 2);
    assert_eq!(first.snapshot.gel, 1);
    assert_eq!(first.snapshot.completed_lessons, 1);
    assert_eq!(first.snapshot.streak, 1);

    // Identical retry: no error, no second credit, prior record returned
    let second = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        lesson_reward(),
    )
    .await
    .expect("duplicate completion must be a no-op");

    assert!(second.already_completed);
    assert_eq!(second.credited.xp, 0);
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(second.snapshot.xp, 10, "no double XP credit");
    assert_eq!(second.snapshot.gems, 2);
    assert_eq!(second.snapshot.completed_lessons, 1);
}

#[tokio::test]
async fn test_completion_count_is_monotonic() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "gio").await;
    let (language_id, lesson_id) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    let mut last_count = 0;
    for _ in 0..3 {
        let outcome = progress::record_completion(
            &db,
            user_id,
            language_id,
            ContentKind::Lesson,
            lesson_id,
            lesson_reward(),
        )
        .await
        .expect("completion");
        assert!(outcome.snapshot.completed_lessons >= last_count);
        last_count = outcome.snapshot.completed_lessons;
    }
    assert_eq!(last_count, 1);
}

#[tokio::test]
async fn test_concurrent_same_item_completion_credits_once() {
    // Shared-cache in-memory database so both pooled connections see one store
    let db = db::init_db("sqlite:file:completion_race?mode=memory&cache=shared")
        .await
        .expect("Failed to init DB");
    let user_id = create_test_user(&db, "dato").await;
    let (language_id, lesson_id) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    let (a, b) = futures::join!(
        progress::record_completion(
            &db,
            user_id,
            language_id,
            ContentKind::Lesson,
            lesson_id,
            lesson_reward(),
        ),
        progress::record_completion(
            &db,
            user_id,
            language_id,
            ContentKind::Lesson,
            lesson_id,
            lesson_reward(),
        )
    );

    let a = a.expect("first concurrent completion");
    let b = b.expect("second concurrent completion");

    // Exactly one call got the credit
    assert_ne!(
        a.already_completed, b.already_completed,
        "exactly one of the two concurrent calls may credit"
    );

    let account = user::Entity::find_by_id(user_id)
        .one(&db)
        .await
        .expect("fetch user")
        .expect("user exists");
    assert_eq!(account.xp, 10, "only one XP credit landed");
    assert_eq!(account.gems, 2);

    let records = completed_item::Entity::find()
        .filter(completed_item::Column::ItemId.eq(lesson_id))
        .count(&db)
        .await
        .expect("count records");
    assert_eq!(records, 1, "exactly one completion record");
}

#[tokio::test]
async fn test_completion_requires_known_active_item() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "eka").await;
    let (language_id, lesson_id) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    // Unknown item id
    let missing = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        9999,
        lesson_reward(),
    )
    .await;
    assert!(matches!(missing, Err(LedgerError::NotFound)));

    // Kind mismatch is also NotFound (the lesson is not a unit)
    let mismatch = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Unit,
        lesson_id,
        lesson_reward(),
    )
    .await;
    assert!(matches!(mismatch, Err(LedgerError::NotFound)));

    // Disabled items cannot be completed
    content::disable_item(&db, lesson_id)
        .await
        .expect("disable lesson");
    let disabled = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        lesson_reward(),
    )
    .await;
    assert!(matches!(disabled, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn test_negative_reward_rejected_without_mutation() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "vano").await;
    let (language_id, lesson_id) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    let result = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        RewardInput {
            xp_base: -5,
            gems: 0,
            gel: 0,
        },
    )
    .await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    let account = user::Entity::find_by_id(user_id)
        .one(&db)
        .await
        .expect("fetch user")
        .expect("user exists");
    assert_eq!(account.xp, 0, "no partial mutation on validation failure");

    let view = progress::get_progress(&db, user_id, language_id)
        .await
        .expect("view");
    assert_eq!(view.snapshot.completed_lessons, 0);
}

#[tokio::test]
async fn test_value_points_filter_unknown_keys() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "nino").await;
    let (language_id, _) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    let mut updates = BTreeMap::new();
    updates.insert("patience".to_string(), 3);
    updates.insert("made_up_key".to_string(), 99);

    let view = progress::update_value_points(&db, user_id, language_id, &updates)
        .await
        .expect("update with at least one valid key must succeed");

    assert_eq!(view.value_points.get("patience"), Some(&3));
    assert!(!view.value_points.contains_key("made_up_key"));

    // Merge is additive, never an overwrite
    let mut more = BTreeMap::new();
    more.insert("patience".to_string(), 2);
    more.insert("gratitude".to_string(), 1);
    let merged = progress::update_value_points(&db, user_id, language_id, &more)
        .await
        .expect("second update");
    assert_eq!(merged.value_points.get("patience"), Some(&5));
    assert_eq!(merged.value_points.get("gratitude"), Some(&1));
}

#[tokio::test]
async fn test_value_points_all_unknown_rejected() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "lasha").await;
    let (language_id, _) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    let mut updates = BTreeMap::new();
    updates.insert("made_up_key".to_string(), 99);

    let result = progress::update_value_points(&db, user_id, language_id, &updates).await;
    assert!(matches!(result, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn test_current_lesson_pointer_overwritten() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "tamar").await;
    let (language_id, lesson_id) = create_test_course(&db, "ka").await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");

    let first = progress::set_current_lesson(&db, user_id, language_id, lesson_id, 0.25)
        .await
        .expect("set pointer");
    assert_eq!(first.progress, 0.25);

    let second = progress::set_current_lesson(&db, user_id, language_id, lesson_id, 0.75)
        .await
        .expect("overwrite pointer");
    assert_eq!(second.progress, 0.75);

    let view = progress::get_progress(&db, user_id, language_id)
        .await
        .expect("view");
    let current = view.current_lesson.expect("pointer present");
    assert_eq!(current.lesson_id, lesson_id);
    assert_eq!(current.progress, 0.75);

    // Out-of-range progress is rejected
    let bad = progress::set_current_lesson(&db, user_id, language_id, lesson_id, 1.5).await;
    assert!(matches!(bad, Err(LedgerError::Validation(_))));
}

#[tokio::test]
async fn test_progress_view_aggregates_percentages() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "irakli").await;
    let (language_id, lesson_id) = create_test_course(&db, "ka").await;

    // A second lesson in the same unit
    let lesson = lingopath::models::content_item::Entity::find_by_id(lesson_id)
        .one(&db)
        .await
        .expect("find lesson")
        .expect("lesson exists");
    let second_lesson = content::create_item(
        &db,
        ContentItemDto {
            kind: "lesson".to_string(),
            language_id,
            parent_id: lesson.parent_id,
            title: "Lesson 2".to_string(),
            xp_reward: Some(10),
            gem_reward: None,
            gel_reward: None,
        },
    )
    .await
    .expect("create second lesson");
    assert_eq!(second_lesson.position, lesson.position + 1);

    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start learning");
    progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        lesson_reward(),
    )
    .await
    .expect("complete lesson 1");

    let view = progress::get_progress(&db, user_id, language_id)
        .await
        .expect("view");
    assert_eq!(view.chapters.len(), 1);
    assert_eq!(view.chapters[0].total_lessons, 2);
    assert_eq!(view.chapters[0].completed_lessons, 1);
    assert_eq!(view.chapters[0].percent_complete, 50.0);
    assert_eq!(view.chapters[0].units[0].percent_complete, 50.0);
}
