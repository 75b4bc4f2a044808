use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::api::error_response;
use crate::auth::{resolve_user, Claims};
use crate::domain::ContentKind;
use crate::services::progress;
use crate::services::reward::RewardInput;

#[derive(Deserialize)]
pub struct CompletionRequest {
    pub item_kind: String,
    pub item_id: i32,
    #[serde(flatten)]
    pub reward: RewardInput,
}

#[derive(Deserialize)]
pub struct CurrentLessonRequest {
    pub lesson_id: i32,
    #[serde(default)]
    pub progress: f64,
}

pub async fn start_learning(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(language_id): Path<i32>,
) -> impl IntoResponse {
    let account = match resolve_user(&db, &claims).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    match progress::start_learning(&db, account.id, language_id).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/progress/{language_id}/complete",
    responses(
        (status = 200, description = "Completion recorded (or idempotent no-op for an already-completed item)"),
        (status = 404, description = "User, language or content item not found"),
        (status = 422, description = "Invalid reward input")
    )
)]
pub async fn record_completion(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(language_id): Path<i32>,
    Json(payload): Json<CompletionRequest>,
) -> impl IntoResponse {
    let account = match resolve_user(&db, &claims).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let kind = match ContentKind::parse(&payload.item_kind) {
        Ok(k) => k,
        Err(e) => return error_response(e).into_response(),
    };

    match progress::record_completion(
        &db,
        account.id,
        language_id,
        kind,
        payload.item_id,
        payload.reward,
    )
    .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_progress(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(language_id): Path<i32>,
) -> impl IntoResponse {
    let account = match resolve_user(&db, &claims).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    match progress::get_progress(&db, account.id, language_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn set_current_lesson(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(language_id): Path<i32>,
    Json(payload): Json<CurrentLessonRequest>,
) -> impl IntoResponse {
    let account = match resolve_user(&db, &claims).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    match progress::set_current_lesson(
        &db,
        account.id,
        language_id,
        payload.lesson_id,
        payload.progress,
    )
    .await
    {
        Ok(lesson) => (StatusCode::OK, Json(lesson)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn update_value_points(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(language_id): Path<i32>,
    Json(updates): Json<BTreeMap<String, i64>>,
) -> impl IntoResponse {
    let account = match resolve_user(&db, &claims).await {
        Ok(u) => u,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    match progress::update_value_points(&db, account.id, language_id, &updates).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
