use crate::error::Result;
use crate::models::question::Question;
use sqlx::PgPool;
use uuid::Uuid;

/// Read-only access to the question bank. Authoring and approval of
/// questions live outside this service.
#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

#[derive(Debug, Default)]
pub struct QuestionBankFilter {
    pub grade: Option<String>,
    pub subject: Option<String>,
    pub module: Option<String>,
    pub difficulty: Option<String>,
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the subset of `ids` that resolve to active, approved questions.
    /// Callers compare cardinality against the requested set to detect
    /// missing or unapproved references.
    pub async fn find_active_approved(&self, ids: &[Uuid]) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE id = ANY($1) AND is_active = TRUE AND approved_by IS NOT NULL
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn find_question(&self, id: Uuid) -> Result<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(question)
    }

    /// Question bank lookup for assessment authoring.
    pub async fn list_approved(&self, filter: QuestionBankFilter) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE is_active = TRUE AND approved_by IS NOT NULL
              AND ($1::text IS NULL OR grade = $1)
              AND ($2::text IS NULL OR subject = $2)
              AND ($3::text IS NULL OR module = $3)
              AND ($4::text IS NULL OR difficulty = $4)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.grade)
        .bind(filter.subject)
        .bind(filter.module)
        .bind(filter.difficulty)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }
}
