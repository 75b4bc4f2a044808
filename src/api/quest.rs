use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::{resolve_user, Claims};
use crate::services::quest;

#[derive(Deserialize)]
pub struct AdvanceRequest {
    pub condition_type: String,
    pub increment_value: i64,
}

pub async fn list_quests(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
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

    match quest::list_user_quests(&db, account.id).await {
        Ok(quests) => (StatusCode::OK, Json(quests)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/quests/advance",
    responses(
        (status = 200, description = "Conditions advanced; was_completed is true only on a completion edge"),
        (status = 422, description = "Invalid condition type or increment")
    )
)]
pub async fn advance_condition(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<AdvanceRequest>,
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

    match quest::advance_condition(
        &db,
        account.id,
        &payload.condition_type,
        payload.increment_value,
    )
    .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn assign_quest(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(quest_id): Path<i32>,
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

    match quest::assign_quest(&db, account.id, quest_id).await {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
