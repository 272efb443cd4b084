#![allow(dead_code)]

use academy_backend::database::{FixedClock, TenantContext};
use academy_backend::entities::{
    BillingType, LessonStatus, OccurrenceStatus, RuleOwnerType, SubscriptionStatus,
    group_student_entity as group_students, lesson_entity as lessons,
    lesson_occurrence_entity as occurrences, lesson_student_entity as lesson_students,
    schedule_rule_entity as schedule_rules, student_entity as students,
    subscription_entity as subscriptions, subscription_type_entity as subscription_types,
};
use academy_backend::error::AppResult;
use academy_backend::services::{
    AbsenceNotice, ActivityLogService, AttendanceService, EmailSender, FreezeService,
    NotificationService, ScheduleService,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use std::sync::{Arc, Mutex};

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Fresh in-memory tenant database with the full schema.
pub async fn setup_tenant(now: DateTime<Utc>, tz: Tz) -> (TenantContext, Arc<FixedClock>) {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let clock = Arc::new(FixedClock::new(now));
    let tenant = TenantContext::new("test", db, tz).with_clock(clock.clone());
    (tenant, clock)
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<AbsenceNotice>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<AbsenceNotice> {
        self.sent.lock().unwrap().clone()
    }

    /// Waits for the detached send task to run.
    pub async fn wait_for(&self, count: usize) -> Vec<AbsenceNotice> {
        for _ in 0..50 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_absence_notice(&self, notice: AbsenceNotice) -> AppResult<()> {
        self.sent.lock().unwrap().push(notice);
        Ok(())
    }
}

pub fn attendance_service(mailer: Arc<RecordingMailer>) -> AttendanceService {
    AttendanceService::new(
        Arc::new(NotificationService::new()),
        Arc::new(ActivityLogService::new()),
        mailer,
        3,
    )
}

pub fn freeze_service() -> FreezeService {
    FreezeService::new(Arc::new(ActivityLogService::new()))
}

pub fn schedule_service() -> ScheduleService {
    ScheduleService::default()
}

pub async fn seed_student(tenant: &TenantContext, name: &str, email: Option<&str>) -> students::Model {
    let now = tenant.now();
    students::ActiveModel {
        full_name: Set(name.to_string()),
        email: Set(email.map(str::to_string)),
        balance: Set(100_000),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap()
}

pub async fn seed_type(tenant: &TenantContext, billing_type: BillingType) -> subscription_types::Model {
    subscription_types::ActiveModel {
        name: Set(format!("{billing_type:?} plan")),
        billing_type: Set(billing_type),
        created_at: Set(tenant.now()),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap()
}

pub struct SubscriptionSeed {
    pub total_units: i32,
    pub used_units: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub paid_till: Option<NaiveDate>,
    pub price_per_unit: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for SubscriptionSeed {
    fn default() -> Self {
        Self {
            total_units: 8,
            used_units: 0,
            start_date: date(2024, 1, 1),
            end_date: Some(date(2024, 12, 31)),
            paid_till: Some(date(2024, 12, 31)),
            price_per_unit: None,
            created_at: None,
        }
    }
}

pub async fn seed_subscription(
    tenant: &TenantContext,
    student_id: i64,
    type_id: i64,
    seed: SubscriptionSeed,
) -> subscriptions::Model {
    let created_at = seed.created_at.unwrap_or_else(|| tenant.now());
    subscriptions::ActiveModel {
        student_id: Set(student_id),
        type_id: Set(type_id),
        total_units: Set(seed.total_units),
        used_units: Set(seed.used_units),
        remaining_units: Set(seed.total_units - seed.used_units),
        start_date: Set(seed.start_date),
        end_date: Set(seed.end_date),
        paid_till: Set(seed.paid_till),
        freeze_days_remaining: Set(0),
        status: Set(SubscriptionStatus::Active),
        version: Set(0),
        price_per_unit: Set(seed.price_per_unit),
        created_at: Set(created_at),
        updated_at: Set(created_at),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap()
}

/// Individual lesson for `student_id` lasting `minutes`.
pub async fn seed_lesson(
    tenant: &TenantContext,
    title: &str,
    student_id: Option<i64>,
    group_id: Option<i64>,
    start: DateTime<Utc>,
    minutes: i64,
) -> lessons::Model {
    let now = tenant.now();
    lessons::ActiveModel {
        title: Set(title.to_string()),
        subject_id: Set(Some(11)),
        teacher_id: Set(Some(21)),
        group_id: Set(group_id),
        student_id: Set(student_id),
        room_id: Set(None),
        start_time: Set(start),
        end_time: Set(start + Duration::minutes(minutes)),
        status: Set(LessonStatus::Scheduled),
        is_makeup: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap()
}

pub async fn enroll(tenant: &TenantContext, lesson_id: i64, student_id: i64) {
    lesson_students::ActiveModel {
        lesson_id: Set(lesson_id),
        student_id: Set(student_id),
        created_at: Set(tenant.now()),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap();
}

pub async fn join_group(tenant: &TenantContext, group_id: i64, student_id: i64, is_active: bool) {
    group_students::ActiveModel {
        group_id: Set(group_id),
        student_id: Set(student_id),
        is_active: Set(is_active),
        joined_at: Set(tenant.now()),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap();
}

pub async fn seed_rule(
    tenant: &TenantContext,
    expr: &str,
    window_start: DateTime<Utc>,
    window_end: Option<DateTime<Utc>>,
    timezone: &str,
) -> schedule_rules::Model {
    let now = tenant.now();
    schedule_rules::ActiveModel {
        owner_type: Set(RuleOwnerType::Group),
        owner_id: Set(1),
        recurrence_expr: Set(expr.to_string()),
        window_start: Set(window_start),
        window_end: Set(window_end),
        duration_minutes: Set(90),
        timezone: Set(timezone.to_string()),
        location: Set(Some("Room 4".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap()
}

pub async fn seed_occurrence(
    tenant: &TenantContext,
    rule_id: i64,
    starts_at: DateTime<Utc>,
    status: OccurrenceStatus,
) -> occurrences::Model {
    let now = tenant.now();
    occurrences::ActiveModel {
        rule_id: Set(rule_id),
        starts_at: Set(starts_at),
        ends_at: Set(starts_at + Duration::minutes(90)),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(tenant.db())
    .await
    .unwrap()
}
