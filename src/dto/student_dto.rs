use crate::models::assessment::Assessment;
use crate::models::attempt::Attempt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct AvailableAssessment {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub attempt_status: String,
    pub has_attempted: bool,
    pub can_retake: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartAssessmentResponse {
    pub assessment: Assessment,
    pub attempt: Attempt,
    /// Seconds left on the clock: full duration for a fresh attempt,
    /// `max(0, end_time - now)` for a resumed one.
    pub time_remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    #[serde(default)]
    pub selected_answers: Vec<i32>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub time_spent_seconds: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResult {
    pub is_correct: bool,
    pub marks_obtained: i32,
    /// The canonical answer key, revealed per question right after
    /// submission. Deliberate for formative use.
    pub correct_answers: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAssessmentResult {
    pub total_marks: i32,
    pub obtained_marks: i32,
    pub percentage: Decimal,
    pub grade: String,
    pub time_spent_seconds: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentBrief {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub grade: String,
    pub total_marks: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentResult {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub assessment: AssessmentBrief,
}
