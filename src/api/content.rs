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
use crate::auth::Claims;
use crate::models::ContentItemDto;
use crate::services::content;

#[derive(Deserialize)]
pub struct CreateLanguageRequest {
    pub code: String,
    pub name: String,
}

fn require_admin(claims: &Claims) -> Result<(), axum::response::Response> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin role required" })),
        )
            .into_response())
    }
}

pub async fn create_language(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(payload): Json<CreateLanguageRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&claims) {
        return resp;
    }

    match content::create_language(&db, &payload.code, &payload.name).await {
        Ok(lang) => (StatusCode::CREATED, Json(lang)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn create_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(dto): Json<ContentItemDto>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&claims) {
        return resp;
    }

    match content::create_item(&db, dto).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn disable_item(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&claims) {
        return resp;
    }

    match content::disable_item(&db, id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn language_tree(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(language_id): Path<i32>,
) -> impl IntoResponse {
    match content::language_items(&db, language_id).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
