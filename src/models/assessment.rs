use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";

pub const GRADE_LEVELS: [&str; 10] = [
    "Grade 1", "Grade 2", "Grade 3", "Grade 4", "Grade 5", "Grade 6", "Grade 7", "Grade 8",
    "Grade 9", "Grade 10",
];

/// A scheduled, timed assessment targeted at grade/section cohorts.
/// `questions` and `target_students` are JSONB sub-documents; decode them
/// with [`Assessment::question_refs`] and [`Assessment::target_cohorts`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assessment {
    pub id: Uuid,
    pub title: String,
    pub instructions: String,
    pub grade: String,
    pub subject: String,
    pub modules: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub questions: JsonValue,
    pub total_marks: i32,
    pub target_students: JsonValue,
    pub school_id: Uuid,
    pub created_by: Uuid,
    pub status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the assessment's ordered question list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    pub question_id: Uuid,
    pub order: i32,
    #[serde(default = "default_marks")]
    pub marks: i32,
}

fn default_marks() -> i32 {
    1
}

/// A (grade, sections) targeting rule. Empty `sections` means every section
/// of that grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetCohort {
    pub grade: String,
    #[serde(default)]
    pub sections: Vec<String>,
}

impl Assessment {
    pub fn question_refs(&self) -> Vec<AssessmentQuestion> {
        serde_json::from_value(self.questions.clone()).unwrap_or_default()
    }

    pub fn target_cohorts(&self) -> Vec<TargetCohort> {
        serde_json::from_value(self.target_students.clone()).unwrap_or_default()
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == STATUS_PUBLISHED && self.start_date <= now && now <= self.end_date
    }
}

/// Derived attribute: the sum of per-question marks. Recomputed whenever the
/// question list changes.
pub fn total_marks(questions: &[AssessmentQuestion]) -> i32 {
    questions.iter().map(|q| q.marks).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assessment(status: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Assessment {
        let now = Utc::now();
        Assessment {
            id: Uuid::new_v4(),
            title: "Quiz".to_string(),
            instructions: "Answer everything".to_string(),
            grade: "Grade 7".to_string(),
            subject: "Math".to_string(),
            modules: vec![],
            start_date: start,
            end_date: end,
            duration_minutes: 30,
            questions: serde_json::json!([]),
            total_marks: 0,
            target_students: serde_json::json!([]),
            school_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            status: status.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_window_is_inclusive_at_both_ends() {
        let now = Utc::now();
        let a = assessment(STATUS_PUBLISHED, now - Duration::hours(1), now + Duration::hours(1));
        assert!(a.is_open_at(now));
        assert!(a.is_open_at(a.start_date));
        assert!(a.is_open_at(a.end_date));
        assert!(!a.is_open_at(a.start_date - Duration::seconds(1)));
        assert!(!a.is_open_at(a.end_date + Duration::seconds(1)));
    }

    #[test]
    fn draft_is_never_open() {
        let now = Utc::now();
        let a = assessment(STATUS_DRAFT, now - Duration::hours(1), now + Duration::hours(1));
        assert!(!a.is_open_at(now));
    }

    #[test]
    fn total_marks_sums_per_question_marks() {
        let questions = vec![
            AssessmentQuestion {
                question_id: Uuid::new_v4(),
                order: 1,
                marks: 1,
            },
            AssessmentQuestion {
                question_id: Uuid::new_v4(),
                order: 2,
                marks: 2,
            },
        ];
        assert_eq!(total_marks(&questions), 3);
        assert_eq!(total_marks(&[]), 0);
    }

    #[test]
    fn question_marks_default_to_one() {
        let q: AssessmentQuestion = serde_json::from_value(serde_json::json!({
            "question_id": Uuid::new_v4(),
            "order": 1,
        }))
        .unwrap();
        assert_eq!(q.marks, 1);
    }
}
