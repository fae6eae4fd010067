//! HR domain services and the GraphQL schema built on top of them.

pub mod assistant;
pub mod attendance;
pub mod auth;
pub mod employees;
pub mod error;
pub mod mailer;
pub mod page;
pub mod payroll;
pub mod reviews;
pub mod schema;
pub mod seed;
pub mod settings;

pub use error::{ApiError, ApiResult};
pub use schema::{build_schema, AppSchema, HrSchema};
pub use seed::{seed_hr_demo, SeededHrRecords};
