use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::student_dto::SubmitAnswerRequest,
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};

fn user_id(claims: &Claims) -> Result<Uuid> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::Unauthorized("Invalid token subject".to_string()))
}

#[axum::debug_handler]
pub async fn available_assessments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let assessments = state.attempt_service.available(user_id(&claims)?).await?;
    Ok(Json(json!({
        "success": true,
        "data": assessments,
    })))
}

#[axum::debug_handler]
pub async fn start_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let response = state
        .attempt_service
        .start_or_resume(user_id(&claims)?, id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assessment started",
        "data": response,
    })))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let result = state
        .attempt_service
        .submit_answer(user_id(&claims)?, id, payload)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Answer submitted successfully",
        "data": result,
    })))
}

#[axum::debug_handler]
pub async fn submit_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let result = state
        .attempt_service
        .submit(user_id(&claims)?, id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assessment submitted successfully",
        "data": result,
    })))
}

#[axum::debug_handler]
pub async fn my_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let results = state.attempt_service.my_results(user_id(&claims)?).await?;
    Ok(Json(json!({
        "success": true,
        "data": results,
    })))
}
