pub mod assessment;
pub mod attempt;
pub mod mentor;
pub mod notification;
pub mod question;
pub mod school;
pub mod student;
