pub mod attendance_record;
pub mod chat_message;
pub mod conversation;
pub mod department;
pub mod employee_profile;
pub mod payroll_line;
pub mod performance_review;
pub mod review_cycle;
pub mod user_profile;
pub mod user_secret;
