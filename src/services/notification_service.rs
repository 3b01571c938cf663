use crate::error::Result;
use crate::models::assessment::Assessment;
use crate::models::notification::{Notification, NotificationAudience};
use sqlx::PgPool;
use uuid::Uuid;

/// Records notification intents for published assessments. Delivery is an
/// external collaborator; a failure here must never roll back a publish.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn notify_assessment_published(
        &self,
        assessment: &Assessment,
        message: &str,
        sent_by: Uuid,
    ) -> Result<Notification> {
        let audience: Vec<NotificationAudience> = assessment
            .target_cohorts()
            .into_iter()
            .map(|cohort| NotificationAudience {
                grade: cohort.grade,
                sections: cohort.sections,
                school_id: assessment.school_id,
            })
            .collect();

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications
                (title, message, kind, priority, target_audience, related_assessment_id, sent_by, status)
            VALUES ($1, $2, 'assessment', 'high', $3, $4, $5, 'sent')
            RETURNING *
            "#,
        )
        .bind(format!("New Assessment: {}", assessment.title))
        .bind(message)
        .bind(serde_json::to_value(&audience)?)
        .bind(assessment.id)
        .bind(sent_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }
}
