use crate::models::assessment::{Assessment, AssessmentQuestion, TargetCohort};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAssessmentPayload {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "instructions are required"))]
    pub instructions: String,
    #[validate(length(min = 1, message = "grade is required"))]
    pub grade: String,
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,
    #[serde(default)]
    pub modules: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1, message = "duration must be at least one minute"))]
    pub duration_minutes: i32,
    #[validate(length(min = 1, message = "at least one question is required"))]
    pub questions: Vec<AssessmentQuestion>,
    /// Defaults to one cohort covering every section of `grade`.
    pub target_students: Option<Vec<TargetCohort>>,
    /// Required for top-level roles; ignored for mentors, whose first
    /// assigned school owns the assessment.
    pub school_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct UpdateAssessmentPayload {
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub grade: Option<String>,
    pub subject: Option<String>,
    pub modules: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "duration must be at least one minute"))]
    pub duration_minutes: Option<i32>,
    pub questions: Option<Vec<AssessmentQuestion>>,
    pub target_students: Option<Vec<TargetCohort>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ListAssessmentsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublishAssessmentPayload {
    pub notification_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuestionBankQuery {
    pub grade: Option<String>,
    pub subject: Option<String>,
    pub module: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentListItem {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub school_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct PaginatedAssessments {
    pub data: Vec<AssessmentListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentAnalytics {
    pub total_attempts: i64,
    pub completed_attempts: i64,
    pub average_score: Decimal,
    pub average_percentage: Decimal,
    pub completion_rate: Decimal,
    pub grade_distribution: HashMap<String, i64>,
}
