pub mod assessment;
pub mod health;
pub mod student_assessment;
