pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    analytics_service::AnalyticsService, assessment_service::AssessmentService,
    attempt_service::AttemptService, question_service::QuestionService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub assessment_service: AssessmentService,
    pub attempt_service: AttemptService,
    pub analytics_service: AnalyticsService,
    pub question_service: QuestionService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let assessment_service = AssessmentService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let analytics_service = AnalyticsService::new(pool.clone());
        let question_service = QuestionService::new(pool.clone());

        Self {
            pool,
            assessment_service,
            attempt_service,
            analytics_service,
            question_service,
        }
    }
}
