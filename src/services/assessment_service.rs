use crate::dto::assessment_dto::{
    AssessmentListItem, CreateAssessmentPayload, ListAssessmentsQuery, PaginatedAssessments,
    Pagination, UpdateAssessmentPayload,
};
use crate::error::{Error, Result};
use crate::models::assessment::{
    self, Assessment, AssessmentQuestion, TargetCohort, GRADE_LEVELS, STATUS_DRAFT,
    STATUS_PUBLISHED,
};
use crate::models::school::School;
use crate::services::actor::{Actor, Capability};
use crate::services::notification_service::NotificationService;
use crate::services::question_service::QuestionService;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

#[derive(Clone)]
pub struct AssessmentService {
    pool: PgPool,
    questions: QuestionService,
    notifications: NotificationService,
}

impl AssessmentService {
    pub fn new(pool: PgPool) -> Self {
        let questions = QuestionService::new(pool.clone());
        let notifications = NotificationService::new(pool.clone());
        Self {
            pool,
            questions,
            notifications,
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        payload: CreateAssessmentPayload,
    ) -> Result<Assessment> {
        if !actor.has(Capability::CreateAssessments) {
            return Err(Error::Forbidden(
                "Access denied. Insufficient permissions.".to_string(),
            ));
        }

        let now = Utc::now();
        validate_schedule(payload.start_date, payload.end_date, Some(now))?;
        validate_grade(&payload.grade)?;
        validate_question_list(&payload.questions)?;

        let school_id = if actor.role == crate::services::actor::Role::Mentor {
            actor.primary_school().ok_or_else(|| {
                Error::Forbidden("Mentor not found or no schools assigned".to_string())
            })?
        } else {
            payload
                .school_id
                .ok_or_else(|| Error::BadRequest("School is required".to_string()))?
        };

        self.ensure_questions_usable(&payload.questions).await?;

        let total_marks = assessment::total_marks(&payload.questions);
        let target_students = payload.target_students.unwrap_or_else(|| {
            vec![TargetCohort {
                grade: payload.grade.clone(),
                sections: vec![],
            }]
        });

        let created = sqlx::query_as::<_, Assessment>(
            r#"
            INSERT INTO assessments (
                title, instructions, grade, subject, modules, start_date, end_date,
                duration_minutes, questions, total_marks, target_students,
                school_id, created_by, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.instructions)
        .bind(&payload.grade)
        .bind(&payload.subject)
        .bind(&payload.modules)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.duration_minutes)
        .bind(serde_json::to_value(&payload.questions)?)
        .bind(total_marks)
        .bind(serde_json::to_value(&target_students)?)
        .bind(school_id)
        .bind(actor.user_id)
        .bind(STATUS_DRAFT)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Assessment> {
        let assessment = self.find(id).await?;
        if actor.role == crate::services::actor::Role::Mentor
            && !actor.in_scope(assessment.school_id)
        {
            return Err(Error::Forbidden(
                "Access denied - not assigned to this school".to_string(),
            ));
        }
        Ok(assessment)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        query: ListAssessmentsQuery,
    ) -> Result<PaginatedAssessments> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        // Mentors see their school set and their own assessments; other
        // non-top-level roles only their own; top-level roles see all.
        let school_scope: Option<Vec<Uuid>> =
            if actor.role == crate::services::actor::Role::Mentor {
                Some(actor.school_ids.clone())
            } else {
                None
            };
        let created_by: Option<Uuid> = if actor.role.is_top_level() {
            None
        } else {
            Some(actor.user_id)
        };

        let rows = sqlx::query_as::<_, Assessment>(
            r#"
            SELECT * FROM assessments
            WHERE is_active = TRUE
              AND ($1::text IS NULL OR status = $1)
              AND ($2::uuid[] IS NULL OR school_id = ANY($2))
              AND ($3::uuid IS NULL OR created_by = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&query.status)
        .bind(&school_scope)
        .bind(created_by)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM assessments
            WHERE is_active = TRUE
              AND ($1::text IS NULL OR status = $1)
              AND ($2::uuid[] IS NULL OR school_id = ANY($2))
              AND ($3::uuid IS NULL OR created_by = $3)
            "#,
        )
        .bind(&query.status)
        .bind(&school_scope)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        let school_names = self.school_names(&rows).await?;
        let data = rows
            .into_iter()
            .map(|assessment| {
                let school_name = school_names.get(&assessment.school_id).cloned();
                AssessmentListItem {
                    assessment,
                    school_name,
                }
            })
            .collect();

        let pages = if limit > 0 {
            (total as f64 / limit as f64).ceil() as i64
        } else {
            1
        };

        Ok(PaginatedAssessments {
            data,
            pagination: Pagination {
                current: page,
                pages,
                total,
            },
        })
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        payload: UpdateAssessmentPayload,
    ) -> Result<Assessment> {
        let assessment = self.find(id).await?;
        authorize_manage(actor, &assessment)?;

        let now = Utc::now();
        if assessment.status == STATUS_PUBLISHED && now >= assessment.start_date {
            return Err(Error::BadRequest(
                "Cannot update published assessment that has started".to_string(),
            ));
        }

        // Schedule invariant holds over the merged (patched) values.
        let effective_start = payload.start_date.unwrap_or(assessment.start_date);
        let effective_end = payload.end_date.unwrap_or(assessment.end_date);
        validate_schedule(effective_start, effective_end, None)?;
        if let Some(grade) = &payload.grade {
            validate_grade(grade)?;
        }

        let (questions_json, total_marks): (Option<JsonValue>, Option<i32>) =
            match &payload.questions {
                Some(questions) => {
                    validate_question_list(questions)?;
                    self.ensure_questions_usable(questions).await?;
                    (
                        Some(serde_json::to_value(questions)?),
                        Some(assessment::total_marks(questions)),
                    )
                }
                None => (None, None),
            };

        let target_students_json = match &payload.target_students {
            Some(targets) => Some(serde_json::to_value(targets)?),
            None => None,
        };

        let updated = sqlx::query_as::<_, Assessment>(
            r#"
            UPDATE assessments
            SET title = COALESCE($1, title),
                instructions = COALESCE($2, instructions),
                grade = COALESCE($3, grade),
                subject = COALESCE($4, subject),
                modules = COALESCE($5, modules),
                start_date = COALESCE($6, start_date),
                end_date = COALESCE($7, end_date),
                duration_minutes = COALESCE($8, duration_minutes),
                questions = COALESCE($9, questions),
                total_marks = COALESCE($10, total_marks),
                target_students = COALESCE($11, target_students),
                updated_at = NOW()
            WHERE id = $12
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.instructions)
        .bind(&payload.grade)
        .bind(&payload.subject)
        .bind(&payload.modules)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.duration_minutes)
        .bind(questions_json)
        .bind(total_marks)
        .bind(target_students_json)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn publish(
        &self,
        actor: &Actor,
        id: Uuid,
        notification_message: Option<String>,
    ) -> Result<Assessment> {
        let assessment = self.find(id).await?;
        authorize_manage(actor, &assessment)?;

        let published = sqlx::query_as::<_, Assessment>(
            r#"UPDATE assessments SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *"#,
        )
        .bind(STATUS_PUBLISHED)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if let Some(message) = notification_message {
            // Fire-and-forget: a failed notification never rolls back the publish.
            if let Err(e) = self
                .notifications
                .notify_assessment_published(&published, &message, actor.user_id)
                .await
            {
                tracing::error!(error = ?e, assessment_id = %id, "failed to record publish notification");
            }
        }

        Ok(published)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let assessment = self.find(id).await?;
        authorize_manage(actor, &assessment)?;

        let attempt_count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM assessment_attempts WHERE assessment_id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if attempt_count > 0 {
            return Err(Error::Conflict(
                "Cannot delete assessment with existing attempts".to_string(),
            ));
        }

        sqlx::query(r#"UPDATE assessments SET is_active = FALSE, updated_at = NOW() WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Assessment> {
        sqlx::query_as::<_, Assessment>(
            r#"SELECT * FROM assessments WHERE id = $1 AND is_active = TRUE"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))
    }

    /// Every referenced question must resolve to an active, approved bank
    /// item; a cardinality mismatch means at least one reference is bad.
    async fn ensure_questions_usable(&self, questions: &[AssessmentQuestion]) -> Result<()> {
        let ids: BTreeSet<Uuid> = questions.iter().map(|q| q.question_id).collect();
        let ids: Vec<Uuid> = ids.into_iter().collect();
        let found = self.questions.find_active_approved(&ids).await?;
        if found.len() != ids.len() {
            return Err(Error::BadRequest(
                "One or more questions not found or not approved".to_string(),
            ));
        }
        Ok(())
    }

    async fn school_names(&self, assessments: &[Assessment]) -> Result<HashMap<Uuid, String>> {
        let ids: BTreeSet<Uuid> = assessments.iter().map(|a| a.school_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<Uuid> = ids.into_iter().collect();
        let schools =
            sqlx::query_as::<_, School>(r#"SELECT * FROM schools WHERE id = ANY($1)"#)
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(schools.into_iter().map(|s| (s.id, s.name)).collect())
    }
}

fn authorize_manage(actor: &Actor, assessment: &Assessment) -> Result<()> {
    if actor.role.is_top_level() {
        return Ok(());
    }
    if !actor.has(Capability::ManageAssessments) {
        return Err(Error::Forbidden(
            "Access denied. Insufficient permissions.".to_string(),
        ));
    }
    if !actor.in_scope(assessment.school_id) || assessment.created_by != actor.user_id {
        return Err(Error::Forbidden("Access denied".to_string()));
    }
    Ok(())
}

fn validate_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    must_be_future_of: Option<DateTime<Utc>>,
) -> Result<()> {
    if let Some(now) = must_be_future_of {
        if start <= now {
            return Err(Error::BadRequest(
                "Start date must be in the future".to_string(),
            ));
        }
    }
    if end <= start {
        return Err(Error::BadRequest(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}

fn validate_grade(grade: &str) -> Result<()> {
    if !GRADE_LEVELS.contains(&grade) {
        return Err(Error::BadRequest(format!("Unknown grade level: {}", grade)));
    }
    Ok(())
}

fn validate_question_list(questions: &[AssessmentQuestion]) -> Result<()> {
    if questions.is_empty() {
        return Err(Error::BadRequest(
            "At least one question is required".to_string(),
        ));
    }
    if questions.iter().any(|q| q.marks < 1) {
        return Err(Error::BadRequest(
            "Question marks must be positive".to_string(),
        ));
    }
    Ok(())
}
