use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::assessment_dto::{
        CreateAssessmentPayload, ListAssessmentsQuery, PublishAssessmentPayload,
        QuestionBankQuery, UpdateAssessmentPayload,
    },
    error::Result,
    middleware::auth::Claims,
    services::actor::Actor,
    services::question_service::QuestionBankFilter,
    AppState,
};

#[axum::debug_handler]
pub async fn create_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssessmentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor = Actor::resolve(&state.pool, &claims).await?;
    let assessment = state.assessment_service.create(&actor, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Assessment created successfully",
            "data": assessment,
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_assessments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListAssessmentsQuery>,
) -> Result<impl IntoResponse> {
    let actor = Actor::resolve(&state.pool, &claims).await?;
    let page = state.assessment_service.list(&actor, query).await?;
    Ok(Json(json!({
        "success": true,
        "data": page.data,
        "pagination": page.pagination,
    })))
}

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor = Actor::resolve(&state.pool, &claims).await?;
    let assessment = state.assessment_service.get(&actor, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": assessment,
    })))
}

#[axum::debug_handler]
pub async fn update_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssessmentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor = Actor::resolve(&state.pool, &claims).await?;
    let assessment = state.assessment_service.update(&actor, id, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assessment updated successfully",
        "data": assessment,
    })))
}

#[axum::debug_handler]
pub async fn publish_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<PublishAssessmentPayload>>,
) -> Result<impl IntoResponse> {
    let actor = Actor::resolve(&state.pool, &claims).await?;
    let message = payload.and_then(|Json(p)| p.notification_message);
    let assessment = state.assessment_service.publish(&actor, id, message).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assessment published successfully",
        "data": assessment,
    })))
}

#[axum::debug_handler]
pub async fn delete_assessment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor = Actor::resolve(&state.pool, &claims).await?;
    state.assessment_service.delete(&actor, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assessment deleted successfully",
    })))
}

#[axum::debug_handler]
pub async fn assessment_analytics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor = Actor::resolve(&state.pool, &claims).await?;
    let analytics = state
        .analytics_service
        .assessment_analytics(&actor, id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "data": analytics,
    })))
}

/// Question bank lookup for assessment authoring.
#[axum::debug_handler]
pub async fn list_bank_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionBankQuery>,
) -> Result<impl IntoResponse> {
    let questions = state
        .question_service
        .list_approved(QuestionBankFilter {
            grade: query.grade,
            subject: query.subject,
            module: query.module,
            difficulty: query.difficulty,
        })
        .await?;
    Ok(Json(json!({
        "success": true,
        "data": questions,
    })))
}
