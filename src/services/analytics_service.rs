use crate::dto::assessment_dto::AssessmentAnalytics;
use crate::error::{Error, Result};
use crate::models::assessment::Assessment;
use crate::models::attempt::Attempt;
use crate::services::actor::Actor;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct AnalyticsService {
    pool: PgPool,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn assessment_analytics(
        &self,
        actor: &Actor,
        assessment_id: Uuid,
    ) -> Result<AssessmentAnalytics> {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"SELECT * FROM assessments WHERE id = $1 AND is_active = TRUE"#,
        )
        .bind(assessment_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))?;

        if actor.role == crate::services::actor::Role::Mentor
            && !actor.in_scope(assessment.school_id)
        {
            return Err(Error::Forbidden(
                "Access denied - not assigned to this school".to_string(),
            ));
        }

        let attempts = sqlx::query_as::<_, Attempt>(
            r#"SELECT * FROM assessment_attempts WHERE assessment_id = $1"#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(compute_analytics(&attempts))
    }
}

/// Aggregates over every attempt row. In-progress attempts count toward the
/// averages with their running marks and a zero percentage, and dilute the
/// completion rate; only attempts that reached a letter grade appear in the
/// distribution.
pub fn compute_analytics(attempts: &[Attempt]) -> AssessmentAnalytics {
    let total_attempts = attempts.len() as i64;
    let completed_attempts = attempts.iter().filter(|a| a.is_done()).count() as i64;

    let (average_score, average_percentage) = if total_attempts > 0 {
        let marks_sum: i64 = attempts.iter().map(|a| a.total_marks_obtained as i64).sum();
        let pct_sum: Decimal = attempts
            .iter()
            .map(|a| a.percentage.unwrap_or(Decimal::ZERO))
            .sum();
        let n = Decimal::from(total_attempts);
        (
            (Decimal::from(marks_sum) / n).round_dp(2),
            (pct_sum / n).round_dp(2),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let completion_rate = if total_attempts > 0 {
        let rate = completed_attempts as f64 / total_attempts as f64 * 100.0;
        Decimal::from_f64(rate).unwrap_or(Decimal::ZERO).round_dp(2)
    } else {
        Decimal::ZERO
    };

    let mut grade_distribution: HashMap<String, i64> = HashMap::new();
    for attempt in attempts {
        if let Some(grade) = &attempt.grade {
            *grade_distribution.entry(grade.clone()).or_insert(0) += 1;
        }
    }

    AssessmentAnalytics {
        total_attempts,
        completed_attempts,
        average_score,
        average_percentage,
        completion_rate,
        grade_distribution,
    }
}
