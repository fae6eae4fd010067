pub use sea_orm_migration::prelude::*;

mod m20250101_000001_people;
mod m20250101_000002_attendance_payroll;
mod m20250101_000003_reviews_assistant;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_people::Migration),
            Box::new(m20250101_000002_attendance_payroll::Migration),
            Box::new(m20250101_000003_reviews_assistant::Migration),
        ]
    }
}
