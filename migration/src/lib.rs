pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_students_and_subscriptions;
mod m20250901_000002_create_lessons;
mod m20250901_000003_create_attendance_ledger;
mod m20250901_000004_create_subscription_freezes;
mod m20250901_000005_create_schedule_rules;
mod m20250901_000006_create_notifications_and_activity;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_students_and_subscriptions::Migration),
            Box::new(m20250901_000002_create_lessons::Migration),
            Box::new(m20250901_000003_create_attendance_ledger::Migration),
            Box::new(m20250901_000004_create_subscription_freezes::Migration),
            Box::new(m20250901_000005_create_schedule_rules::Migration),
            Box::new(m20250901_000006_create_notifications_and_activity::Migration),
        ]
    }
}
