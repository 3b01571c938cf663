pub mod assessment_dto;
pub mod student_dto;
