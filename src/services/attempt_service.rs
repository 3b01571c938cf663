use crate::dto::student_dto::{
    AssessmentBrief, AvailableAssessment, StartAssessmentResponse, StudentResult,
    SubmitAnswerRequest, SubmitAnswerResult, SubmitAssessmentResult,
};
use crate::error::{Error, Result};
use crate::models::assessment::{Assessment, STATUS_PUBLISHED};
use crate::models::attempt::{
    Attempt, AttemptAnswer, STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_SUBMITTED, STATUS_TIMEOUT,
};
use crate::models::student::Student;
use crate::services::eligibility;
use crate::services::grading;
use crate::services::question_service::QuestionService;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Drives the attempt state machine: in_progress, then exactly one of
/// submitted or timeout. Expiry is lazy; the clock is only consulted when a
/// student mutates the attempt.
#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    questions: QuestionService,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        let questions = QuestionService::new(pool.clone());
        Self { pool, questions }
    }

    pub async fn available(&self, user_id: Uuid) -> Result<Vec<AvailableAssessment>> {
        let student = self.find_student(user_id).await?;
        let now = Utc::now();

        let assessments = sqlx::query_as::<_, Assessment>(
            r#"
            SELECT * FROM assessments
            WHERE is_active = TRUE
              AND status = $1
              AND school_id = $2
              AND start_date <= $3
              AND end_date >= $3
            ORDER BY start_date ASC
            "#,
        )
        .bind(STATUS_PUBLISHED)
        .bind(student.school_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let assessments: Vec<Assessment> = assessments
            .into_iter()
            .filter(|a| {
                eligibility::is_eligible(
                    &student.grade,
                    student.section.as_deref(),
                    &a.target_cohorts(),
                )
            })
            .collect();

        let attempts = self
            .attempts_for(&assessments, student.id)
            .await?;

        Ok(assessments
            .into_iter()
            .map(|assessment| {
                let attempt = attempts.get(&assessment.id);
                let attempt_status = attempt
                    .map(|a| a.status.clone())
                    .unwrap_or_else(|| "not_attempted".to_string());
                let has_attempted = attempt.is_some();
                AvailableAssessment {
                    assessment,
                    attempt_status,
                    has_attempted,
                    can_retake: false,
                }
            })
            .collect())
    }

    pub async fn start_or_resume(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> Result<StartAssessmentResponse> {
        let student = self.find_student(user_id).await?;
        let assessment = self.find_assessment(assessment_id).await?;
        let now = Utc::now();

        if !assessment.is_open_at(now) {
            return Err(Error::BadRequest(
                "Assessment is not currently available".to_string(),
            ));
        }
        if !eligibility::is_eligible(
            &student.grade,
            student.section.as_deref(),
            &assessment.target_cohorts(),
        ) {
            return Err(Error::Forbidden(
                "You are not eligible for this assessment".to_string(),
            ));
        }

        if let Some(existing) = self.find_attempt(assessment_id, student.id).await? {
            if existing.is_done() {
                return Err(Error::Conflict(
                    "You have already completed this assessment".to_string(),
                ));
            }
            let time_remaining = existing.time_remaining_seconds(now);
            return Ok(StartAssessmentResponse {
                assessment,
                attempt: existing,
                time_remaining,
            });
        }

        // One pre-created empty slot per question keeps grading and progress
        // queries shape-stable for the attempt's whole lifetime.
        let slots: Vec<AttemptAnswer> = assessment
            .question_refs()
            .into_iter()
            .map(|q| AttemptAnswer {
                question_id: q.question_id,
                selected_answers: vec![],
                is_correct: false,
                marks_obtained: 0,
                time_spent_seconds: 0,
            })
            .collect();
        let end_time = now + Duration::minutes(assessment.duration_minutes as i64);

        // Two racing starts both hit the unique (assessment, student) key;
        // the loser inserts nothing and adopts the winner's row.
        let inserted = sqlx::query_as::<_, Attempt>(
            r#"
            INSERT INTO assessment_attempts
                (assessment_id, student_id, answers, status, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (assessment_id, student_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(assessment_id)
        .bind(student.id)
        .bind(serde_json::to_value(&slots)?)
        .bind(STATUS_IN_PROGRESS)
        .bind(now)
        .bind(end_time)
        .fetch_optional(&self.pool)
        .await?;

        let attempt = match inserted {
            Some(attempt) => attempt,
            None => {
                let existing = self
                    .find_attempt(assessment_id, student.id)
                    .await?
                    .ok_or_else(|| Error::Internal("attempt vanished after conflict".to_string()))?;
                if existing.is_done() {
                    return Err(Error::Conflict(
                        "You have already completed this assessment".to_string(),
                    ));
                }
                existing
            }
        };

        let time_remaining = attempt.time_remaining_seconds(now);
        Ok(StartAssessmentResponse {
            assessment,
            attempt,
            time_remaining,
        })
    }

    pub async fn submit_answer(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
        payload: SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResult> {
        let student = self.find_student(user_id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent answer writes for this attempt.
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM assessment_attempts
            WHERE assessment_id = $1 AND student_id = $2
            FOR UPDATE
            "#,
        )
        .bind(assessment_id)
        .bind(student.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("No active attempt found".to_string()))?;

        if attempt.status != STATUS_IN_PROGRESS {
            return Err(Error::BadRequest(
                "Attempt is not in progress".to_string(),
            ));
        }

        if attempt.is_expired(now) {
            sqlx::query(
                r#"
                UPDATE assessment_attempts
                SET status = $1, auto_submitted = TRUE, updated_at = NOW()
                WHERE id = $2
                "#,
            )
            .bind(STATUS_TIMEOUT)
            .bind(attempt.id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Err(Error::BadRequest(
                "Time is up. Assessment has been auto-submitted.".to_string(),
            ));
        }

        let assessment = self.find_assessment(assessment_id).await?;
        let question_ref = assessment
            .question_refs()
            .into_iter()
            .find(|q| q.question_id == payload.question_id)
            .ok_or_else(|| {
                Error::BadRequest("Question is not part of this assessment".to_string())
            })?;

        let question = self
            .questions
            .find_question(payload.question_id)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;

        let is_correct = grading::is_correct_selection(
            &payload.selected_answers,
            &question.correct_answers,
        );
        let marks_obtained = if is_correct { question_ref.marks } else { 0 };

        let mut slots = attempt.answer_slots();
        let slot = slots
            .iter_mut()
            .find(|s| s.question_id == payload.question_id)
            .ok_or_else(|| {
                Error::BadRequest("Question is not part of this assessment".to_string())
            })?;
        slot.selected_answers = payload.selected_answers.clone();
        slot.is_correct = is_correct;
        slot.marks_obtained = marks_obtained;
        slot.time_spent_seconds = payload.time_spent_seconds;

        let total_obtained = grading::total_obtained(&slots);

        sqlx::query(
            r#"
            UPDATE assessment_attempts
            SET answers = $1, total_marks_obtained = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(serde_json::to_value(&slots)?)
        .bind(total_obtained)
        .bind(attempt.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SubmitAnswerResult {
            is_correct,
            marks_obtained,
            correct_answers: question.correct_answers,
        })
    }

    pub async fn submit(
        &self,
        user_id: Uuid,
        assessment_id: Uuid,
    ) -> Result<SubmitAssessmentResult> {
        let student = self.find_student(user_id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let attempt = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM assessment_attempts
            WHERE assessment_id = $1 AND student_id = $2
            FOR UPDATE
            "#,
        )
        .bind(assessment_id)
        .bind(student.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("No active attempt found".to_string()))?;

        if attempt.is_terminal() {
            return Err(Error::Conflict(
                "Assessment has already been submitted".to_string(),
            ));
        }

        let assessment = self.find_assessment(assessment_id).await?;

        let obtained = grading::total_obtained(&attempt.answer_slots());
        let pct = grading::percentage(obtained, assessment.total_marks);
        let grade = grading::letter_grade(pct);
        let stored_pct = grading::percentage_decimal(pct);

        // Wall-clock time capped at the allotted duration.
        let elapsed = (now - attempt.start_time).num_seconds().max(0);
        let time_spent = elapsed.min(assessment.duration_minutes as i64 * 60) as i32;

        sqlx::query(
            r#"
            UPDATE assessment_attempts
            SET status = $1,
                is_submitted = TRUE,
                submitted_at = $2,
                total_marks_obtained = $3,
                percentage = $4,
                grade = $5,
                time_spent_seconds = $6,
                updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(STATUS_SUBMITTED)
        .bind(now)
        .bind(obtained)
        .bind(stored_pct)
        .bind(grade)
        .bind(time_spent)
        .bind(attempt.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SubmitAssessmentResult {
            total_marks: assessment.total_marks,
            obtained_marks: obtained,
            percentage: stored_pct,
            grade: grade.to_string(),
            time_spent_seconds: time_spent,
        })
    }

    pub async fn my_results(&self, user_id: Uuid) -> Result<Vec<StudentResult>> {
        let student = self.find_student(user_id).await?;

        let attempts = sqlx::query_as::<_, Attempt>(
            r#"
            SELECT * FROM assessment_attempts
            WHERE student_id = $1 AND status IN ($2, $3)
            ORDER BY submitted_at DESC NULLS LAST
            "#,
        )
        .bind(student.id)
        .bind(STATUS_SUBMITTED)
        .bind(STATUS_COMPLETED)
        .fetch_all(&self.pool)
        .await?;

        let assessment_ids: Vec<Uuid> = attempts.iter().map(|a| a.assessment_id).collect();
        let briefs: HashMap<Uuid, AssessmentBrief> = sqlx::query_as::<_, Assessment>(
            r#"SELECT * FROM assessments WHERE id = ANY($1)"#,
        )
        .bind(&assessment_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|a| {
            (
                a.id,
                AssessmentBrief {
                    id: a.id,
                    title: a.title,
                    subject: a.subject,
                    grade: a.grade,
                    total_marks: a.total_marks,
                },
            )
        })
        .collect();

        Ok(attempts
            .into_iter()
            .filter_map(|attempt| {
                briefs.get(&attempt.assessment_id).cloned().map(|brief| StudentResult {
                    attempt,
                    assessment: brief,
                })
            })
            .collect())
    }

    async fn find_student(&self, user_id: Uuid) -> Result<Student> {
        sqlx::query_as::<_, Student>(
            r#"SELECT * FROM students WHERE user_id = $1 AND is_active = TRUE"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Student profile not found".to_string()))
    }

    async fn find_assessment(&self, id: Uuid) -> Result<Assessment> {
        sqlx::query_as::<_, Assessment>(
            r#"SELECT * FROM assessments WHERE id = $1 AND is_active = TRUE"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))
    }

    async fn find_attempt(
        &self,
        assessment_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<Attempt>> {
        let attempt = sqlx::query_as::<_, Attempt>(
            r#"SELECT * FROM assessment_attempts WHERE assessment_id = $1 AND student_id = $2"#,
        )
        .bind(assessment_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn attempts_for(
        &self,
        assessments: &[Assessment],
        student_id: Uuid,
    ) -> Result<HashMap<Uuid, Attempt>> {
        if assessments.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = assessments.iter().map(|a| a.id).collect();
        let attempts = sqlx::query_as::<_, Attempt>(
            r#"SELECT * FROM assessment_attempts WHERE assessment_id = ANY($1) AND student_id = $2"#,
        )
        .bind(&ids)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts.into_iter().map(|a| (a.assessment_id, a)).collect())
    }
}
