pub mod admin;
pub mod content;
pub mod health;
pub mod progress;
pub mod quest;
pub mod user;

use axum::{
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use crate::domain::LedgerError;

/// Maps ledger errors onto HTTP. Duplicate completions never reach this path;
/// they are successful no-ops by contract.
pub(crate) fn error_response(e: LedgerError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        LedgerError::NotFound => StatusCode::NOT_FOUND,
        LedgerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("request failed: {}", e);
    }
    (status, Json(json!({ "error": e.to_string() })))
}

pub fn api_router(db: DatabaseConnection) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Progress ledger
        .route(
            "/progress/:language_id/start",
            post(progress::start_learning),
        )
        .route(
            "/progress/:language_id/complete",
            post(progress::record_completion),
        )
        .route("/progress/:language_id", get(progress::get_progress))
        .route(
            "/progress/:language_id/lesson",
            put(progress::set_current_lesson),
        )
        .route(
            "/progress/:language_id/value-points",
            patch(progress::update_value_points),
        )
        // Hearts & boosts
        .route("/hearts/use", post(user::use_heart))
        .route("/hearts", get(user::get_hearts))
        .route("/boost", post(user::grant_boost))
        // Streak
        .route("/streak", get(user::get_streak))
        // Activity
        .route("/activity/login", post(user::record_login))
        // Quests
        .route("/quests", get(quest::list_quests))
        .route("/quests/advance", post(quest::advance_condition))
        .route("/quests/:quest_id/assign", post(quest::assign_quest))
        // Content (admin)
        .route("/content", post(content::create_item))
        .route("/content/languages", post(content::create_language))
        .route("/content/:language_id/tree", get(content::language_tree))
        .route("/content/:id/disable", post(content::disable_item))
        // Admin ledger ops
        .route("/admin/users/:id/credit", post(admin::adjust_credit))
        .route("/admin/users/:id/reset", post(admin::reset_progress))
        .route("/admin/audit", get(admin::list_audit))
        .with_state(db)
}
