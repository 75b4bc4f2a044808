use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::{resolve_user, Claims};
use crate::services::{progress, reward, streak};

#[derive(Deserialize)]
pub struct BoostRequest {
    pub multiplier: f64,
    pub duration_minutes: i32,
}

async fn resolve(
    db: &DatabaseConnection,
    claims: &Claims,
) -> Result<crate::models::user::Model, axum::response::Response> {
    resolve_user(db, claims).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response()
    })
}

pub async fn use_heart(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
    let account = match resolve(&db, &claims).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match reward::use_heart(&db, account.id).await {
        Ok(hearts) => (StatusCode::OK, Json(json!({ "hearts": hearts }))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_hearts(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
    let account = match resolve(&db, &claims).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match reward::current_hearts(&db, account.id).await {
        Ok(hearts) => (StatusCode::OK, Json(json!({ "hearts": hearts }))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn grant_boost(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<BoostRequest>,
) -> impl IntoResponse {
    let account = match resolve(&db, &claims).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match reward::grant_xp_boost(&db, account.id, payload.multiplier, payload.duration_minutes)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "XP boost granted" }))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn get_streak(State(db): State<DatabaseConnection>, claims: Claims) -> impl IntoResponse {
    let account = match resolve(&db, &claims).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match streak::streak_view(&db, account.id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn record_login(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> impl IntoResponse {
    let account = match resolve(&db, &claims).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match progress::record_login(&db, account.id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Login recorded" }))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
