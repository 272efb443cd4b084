pub mod activity_logs;
pub mod attendances;
pub mod balance_transactions;
pub mod group_students;
pub mod lesson_occurrences;
pub mod lesson_students;
pub mod lessons;
pub mod notifications;
pub mod schedule_rules;
pub mod students;
pub mod subscription_consumptions;
pub mod subscription_freezes;
pub mod subscription_types;
pub mod subscriptions;

pub use activity_logs as activity_log_entity;
pub use attendances as attendance_entity;
pub use balance_transactions as balance_transaction_entity;
pub use group_students as group_student_entity;
pub use lesson_occurrences as lesson_occurrence_entity;
pub use lesson_students as lesson_student_entity;
pub use lessons as lesson_entity;
pub use notifications as notification_entity;
pub use schedule_rules as schedule_rule_entity;
pub use students as student_entity;
pub use subscription_consumptions as subscription_consumption_entity;
pub use subscription_freezes as subscription_freeze_entity;
pub use subscription_types as subscription_type_entity;
pub use subscriptions as subscription_entity;

pub use attendances::{AttendanceStatus, UNEXCUSED_REASON};
pub use balance_transactions::BalanceTransactionType;
pub use lesson_occurrences::OccurrenceStatus;
pub use lessons::LessonStatus;
pub use schedule_rules::RuleOwnerType;
pub use subscription_types::BillingType;
pub use subscriptions::SubscriptionStatus;
