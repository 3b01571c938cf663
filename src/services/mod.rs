pub mod actor;
pub mod analytics_service;
pub mod assessment_service;
pub mod attempt_service;
pub mod eligibility;
pub mod grading;
pub mod notification_service;
pub mod question_service;
