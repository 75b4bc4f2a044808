use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::Claims;
use crate::services::admin::{self, CreditType, ResetFlags};

#[derive(Deserialize)]
pub struct AdjustCreditRequest {
    pub credit_type: CreditType,
    pub amount: i64,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    #[serde(flatten)]
    pub flags: ResetFlags,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<u64>,
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

pub async fn adjust_credit(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(user_id): Path<i32>,
    Json(payload): Json<AdjustCreditRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&claims) {
        return resp;
    }
    if payload.reason.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "reason is required" })),
        )
            .into_response();
    }

    match admin::adjust_credit(
        &db,
        &claims.username,
        user_id,
        payload.credit_type,
        payload.amount,
        &payload.reason,
    )
    .await
    {
        Ok(adjustment) => (StatusCode::OK, Json(adjustment)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn reset_progress(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(user_id): Path<i32>,
    Json(payload): Json<ResetRequest>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&claims) {
        return resp;
    }
    if payload.reason.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "reason is required" })),
        )
            .into_response();
    }

    match admin::reset_progress(&db, &claims.username, user_id, payload.flags, &payload.reason)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Progress reset applied" })),
        )
            .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

pub async fn list_audit(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(query): Query<AuditQuery>,
) -> impl IntoResponse {
    if let Err(resp) = require_admin(&claims) {
        return resp;
    }

    match admin::list_audit(&db, query.limit.unwrap_or(100)).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
