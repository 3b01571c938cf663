use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_SUBMITTED: &str = "submitted";
pub const STATUS_TIMEOUT: &str = "timeout";

/// One student's run at one assessment. At most one row exists per
/// (assessment, student) pair; the storage layer enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub student_id: Uuid,
    pub answers: JsonValue,
    pub total_marks_obtained: i32,
    pub percentage: Option<Decimal>,
    pub grade: Option<String>,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub time_spent_seconds: i32,
    pub is_submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub auto_submitted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One answer slot. Every attempt carries exactly one slot per assessment
/// question, pre-created empty on start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub question_id: Uuid,
    #[serde(default)]
    pub selected_answers: Vec<i32>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub marks_obtained: i32,
    #[serde(default)]
    pub time_spent_seconds: i32,
}

impl Attempt {
    pub fn answer_slots(&self) -> Vec<AttemptAnswer> {
        serde_json::from_value(self.answers.clone()).unwrap_or_default()
    }

    /// `submitted` and the legacy `completed` are one logical "done" state;
    /// `timeout` is terminal too but tracked separately.
    pub fn is_done(&self) -> bool {
        self.status == STATUS_SUBMITTED || self.status == STATUS_COMPLETED
    }

    pub fn is_terminal(&self) -> bool {
        self.is_done() || self.status == STATUS_TIMEOUT
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }

    pub fn time_remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.end_time - now).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn attempt_with(status: &str, end_offset_secs: i64) -> Attempt {
        let now = Utc::now();
        Attempt {
            id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            answers: serde_json::json!([]),
            total_marks_obtained: 0,
            percentage: None,
            grade: None,
            status: status.to_string(),
            start_time: now,
            end_time: now + Duration::seconds(end_offset_secs),
            time_spent_seconds: 0,
            is_submitted: false,
            submitted_at: None,
            auto_submitted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn completed_and_submitted_are_both_done() {
        assert!(attempt_with(STATUS_SUBMITTED, 60).is_done());
        assert!(attempt_with(STATUS_COMPLETED, 60).is_done());
        assert!(!attempt_with(STATUS_TIMEOUT, 60).is_done());
        assert!(attempt_with(STATUS_TIMEOUT, 60).is_terminal());
        assert!(!attempt_with(STATUS_IN_PROGRESS, 60).is_terminal());
    }

    #[test]
    fn expiry_is_strict_wall_clock_comparison() {
        let attempt = attempt_with(STATUS_IN_PROGRESS, 60);
        let now = attempt.end_time;
        assert!(!attempt.is_expired(now));
        assert!(attempt.is_expired(now + Duration::seconds(1)));
    }

    #[test]
    fn time_remaining_clamps_at_zero() {
        let attempt = attempt_with(STATUS_IN_PROGRESS, 90);
        assert_eq!(attempt.time_remaining_seconds(attempt.start_time), 90);
        let past_end = attempt.end_time + Duration::seconds(30);
        assert_eq!(attempt.time_remaining_seconds(past_end), 0);
    }
}
