//! Streak integration tests: completion events drive the streak, login events
//! do not, and backfilled history derives the expected run length.

use chrono::{Datelike, Duration, Utc};
use lingopath::db;
use lingopath::domain::ContentKind;
use lingopath::models::{activity_log, user, ContentItemDto};
use lingopath::services::{content, progress, reward::RewardInput, streak};
use sea_orm::{DatabaseConnection, EntityTrait, Set};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_user(db: &DatabaseConnection, username: &str) -> i32 {
    let now = Utc::now().to_rfc3339();
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

async fn backfill_completion_event(db: &DatabaseConnection, user_id: i32, days_ago: i64) {
    let ts = (Utc::now() - Duration::days(days_ago)).to_rfc3339();
    let event = activity_log::ActiveModel {
        user_id: Set(user_id),
        kind: Set("completion".to_string()),
        occurred_at: Set(ts),
        ..Default::default()
    };
    activity_log::Entity::insert(event)
        .exec(db)
        .await
        .expect("Failed to backfill event");
}

#[tokio::test]
async fn test_completion_starts_a_streak() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "streaker").await;
    let (language_id, lesson_id) = create_test_course(&db).await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start");

    let outcome = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        RewardInput {
            xp_base: 10,
            gems: 0,
            gel: 0,
        },
    )
    .await
    .expect("completion");
    assert_eq!(outcome.snapshot.streak, 1);

    let view = streak::streak_view(&db, user_id).await.expect("view");
    assert_eq!(view.current_streak, 1);

    // Today's slot in the Sunday-first week map is lit
    let today_slot = Utc::now().date_naive().weekday().num_days_from_sunday() as usize;
    assert!(view.week_progress[today_slot]);
}

#[tokio::test]
async fn test_logins_do_not_extend_the_streak() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "lurker").await;

    progress::record_login(&db, user_id).await.expect("login");
    progress::record_login(&db, user_id).await.expect("login");

    let view = streak::streak_view(&db, user_id).await.expect("view");
    assert_eq!(view.current_streak, 0);
}

#[tokio::test]
async fn test_backfilled_consecutive_days_form_a_run() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "historian").await;
    let (language_id, lesson_id) = create_test_course(&db).await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start");

    backfill_completion_event(&db, user_id, 2).await;
    backfill_completion_event(&db, user_id, 1).await;

    // Today's completion closes the 3-day run
    let outcome = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        RewardInput {
            xp_base: 10,
            gems: 0,
            gel: 0,
        },
    )
    .await
    .expect("completion");
    assert_eq!(outcome.snapshot.streak, 3);
}

#[tokio::test]
async fn test_gap_beyond_grace_resets_the_run() {
    let db = setup_test_db().await;
    let user_id = create_test_user(&db, "returner").await;
    let (language_id, lesson_id) = create_test_course(&db).await;
    progress::start_learning(&db, user_id, language_id)
        .await
        .expect("start");

    // Old activity well past the one-day grace window
    backfill_completion_event(&db, user_id, 5).await;
    backfill_completion_event(&db, user_id, 4).await;

    let outcome = progress::record_completion(
        &db,
        user_id,
        language_id,
        ContentKind::Lesson,
        lesson_id,
        RewardInput {
            xp_base: 10,
            gems: 0,
            gel: 0,
        },
    )
    .await
    .expect("completion");
    assert_eq!(outcome.snapshot.streak, 1, "old run must not carry over");
}
