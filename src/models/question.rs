use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Question bank item. The attempt engine treats this as read-only ground
/// truth: `correct_answers` holds the indices of the correct choices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub grade: String,
    pub subject: String,
    pub module: String,
    pub answer_type: String,
    pub answer_choices: JsonValue,
    pub correct_answers: Vec<i32>,
    pub difficulty: String,
    pub is_active: bool,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
