mod common;

use academy_backend::database::TenantContext;
use academy_backend::entities::{
    BillingType, LessonStatus, SubscriptionStatus, activity_log_entity as activity_logs,
    lesson_entity as lessons, subscription_entity as subscriptions,
    subscription_freeze_entity as freezes,
};
use academy_backend::error::AppError;
use academy_backend::services::FreezeSubscription;
use academy_backend::utils::time::to_local;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use common::*;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set,
};

fn freeze_req(start: NaiveDate, end: NaiveDate) -> FreezeSubscription {
    FreezeSubscription {
        freeze_start: start,
        freeze_end: end,
        reason: Some("vacation".to_string()),
    }
}

async fn lesson_slot(tenant: &TenantContext, id: i64) -> (NaiveDateTime, Duration) {
    let lesson = lessons::Entity::find_by_id(id)
        .one(tenant.db())
        .await
        .unwrap()
        .unwrap();
    (
        to_local(&tenant.timezone(), lesson.start_time),
        lesson.end_time - lesson.start_time,
    )
}

fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

#[tokio::test]
async fn test_freeze_shifts_dates_and_lessons() {
    let tz = chrono_tz::Asia::Tashkent;
    let (tenant, _) = setup_tenant(utc(2024, 10, 30, 9, 0), tz).await;
    let student = seed_student(&tenant, "Aziza", None).await;
    let other = seed_student(&tenant, "Bobur", None).await;
    let kind = seed_type(&tenant, BillingType::PerLesson).await;
    let sub = seed_subscription(
        &tenant,
        student.id,
        kind.id,
        SubscriptionSeed {
            start_date: date(2024, 10, 1),
            end_date: Some(date(2024, 11, 30)),
            paid_till: Some(date(2024, 11, 30)),
            ..Default::default()
        },
    )
    .await;
    join_group(&tenant, 7, student.id, true).await;
    join_group(&tenant, 8, student.id, false).await;

    // Tashkent is UTC+5: 10:00 local is 05:00 UTC
    let own = seed_lesson(&tenant, "Own", Some(student.id), None, utc(2024, 11, 3, 5, 0), 60).await;
    let group = seed_lesson(&tenant, "Group", None, Some(7), utc(2024, 11, 5, 5, 0), 60).await;
    let roster = seed_lesson(&tenant, "Roster", None, None, utc(2024, 11, 6, 5, 0), 60).await;
    enroll(&tenant, roster.id, student.id).await;
    // 23:30 local on the last freeze day
    let late = seed_lesson(&tenant, "Late", Some(student.id), None, utc(2024, 11, 7, 18, 30), 30).await;
    let outside = seed_lesson(&tenant, "Outside", Some(student.id), None, utc(2024, 11, 20, 5, 0), 60).await;
    let foreign = seed_lesson(&tenant, "Foreign", Some(other.id), None, utc(2024, 11, 3, 5, 0), 60).await;
    let left_group = seed_lesson(&tenant, "Left group", None, Some(8), utc(2024, 11, 2, 5, 0), 60).await;
    let cancelled = seed_lesson(&tenant, "Cancelled", Some(student.id), None, utc(2024, 11, 4, 5, 0), 60).await;
    let mut am = cancelled.clone().into_active_model();
    am.status = Set(LessonStatus::Cancelled);
    am.update(tenant.db()).await.unwrap();

    let outcome = freeze_service()
        .freeze(&tenant, sub.id, freeze_req(date(2024, 11, 1), date(2024, 11, 7)))
        .await
        .unwrap();

    assert_eq!(outcome.freeze_days, 7);
    assert_eq!(outcome.lessons_moved, 4);
    assert_eq!(outcome.subscription.end_date, Some(date(2024, 12, 7)));
    assert_eq!(outcome.subscription.paid_till, Some(date(2024, 12, 7)));
    assert_eq!(outcome.subscription.freeze_days_remaining, 7);
    assert_eq!(outcome.subscription.status, SubscriptionStatus::Active);
    assert_eq!(outcome.subscription.version, sub.version + 1);

    assert_eq!(lesson_slot(&tenant, own.id).await.0, local(2024, 11, 10, 10, 0));
    assert_eq!(lesson_slot(&tenant, own.id).await.1, Duration::minutes(60));
    assert_eq!(lesson_slot(&tenant, group.id).await.0, local(2024, 11, 12, 10, 0));
    assert_eq!(lesson_slot(&tenant, roster.id).await.0, local(2024, 11, 13, 10, 0));
    assert_eq!(lesson_slot(&tenant, late.id).await.0, local(2024, 11, 14, 23, 30));
    assert_eq!(lesson_slot(&tenant, outside.id).await.0, local(2024, 11, 20, 10, 0));
    assert_eq!(lesson_slot(&tenant, foreign.id).await.0, local(2024, 11, 3, 10, 0));
    assert_eq!(lesson_slot(&tenant, left_group.id).await.0, local(2024, 11, 2, 10, 0));
    assert_eq!(lesson_slot(&tenant, cancelled.id).await.0, local(2024, 11, 4, 10, 0));

    let rows = freezes::Entity::find()
        .filter(freezes::Column::SubscriptionId.eq(sub.id))
        .all(tenant.db())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].freeze_start, date(2024, 11, 1));
    assert_eq!(rows[0].freeze_end, date(2024, 11, 7));
    assert_eq!(rows[0].reason.as_deref(), Some("vacation"));

    let logged = activity_logs::Entity::find()
        .filter(activity_logs::Column::StudentId.eq(student.id))
        .filter(activity_logs::Column::ActivityType.eq("freeze"))
        .count(tenant.db())
        .await
        .unwrap();
    assert_eq!(logged, 1);
}

#[tokio::test]
async fn test_freeze_outside_subscription_bounds_is_rejected() {
    let (tenant, _) = setup_tenant(utc(2024, 10, 30, 9, 0), chrono_tz::Asia::Tashkent).await;
    let student = seed_student(&tenant, "Eldor", None).await;
    let kind = seed_type(&tenant, BillingType::PerLesson).await;
    let sub = seed_subscription(
        &tenant,
        student.id,
        kind.id,
        SubscriptionSeed {
            start_date: date(2024, 10, 1),
            end_date: Some(date(2024, 11, 30)),
            paid_till: Some(date(2024, 11, 30)),
            ..Default::default()
        },
    )
    .await;
    let lesson = seed_lesson(&tenant, "Math", Some(student.id), None, utc(2024, 10, 2, 5, 0), 60).await;

    let service = freeze_service();
    let err = service
        .freeze(&tenant, sub.id, freeze_req(date(2024, 9, 30), date(2024, 10, 5)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = service
        .freeze(&tenant, sub.id, freeze_req(date(2024, 11, 25), date(2024, 12, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let unchanged = subscriptions::Entity::find_by_id(sub.id)
        .one(tenant.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, sub);
    let lesson_after = lessons::Entity::find_by_id(lesson.id)
        .one(tenant.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lesson_after.start_time, lesson.start_time);
    assert_eq!(freezes::Entity::find().count(tenant.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_freeze_open_ended_subscription() {
    let (tenant, _) = setup_tenant(utc(2024, 10, 30, 9, 0), chrono_tz::Asia::Tashkent).await;
    let student = seed_student(&tenant, "Gulnora", None).await;
    let kind = seed_type(&tenant, BillingType::Monthly).await;
    let sub = seed_subscription(
        &tenant,
        student.id,
        kind.id,
        SubscriptionSeed {
            start_date: date(2024, 10, 1),
            end_date: None,
            paid_till: Some(date(2024, 10, 31)),
            ..Default::default()
        },
    )
    .await;

    let outcome = freeze_service()
        .freeze(&tenant, sub.id, freeze_req(date(2024, 12, 10), date(2024, 12, 12)))
        .await
        .unwrap();
    assert_eq!(outcome.freeze_days, 3);
    assert_eq!(outcome.lessons_moved, 0);
    assert_eq!(outcome.subscription.end_date, None);
    assert_eq!(outcome.subscription.paid_till, Some(date(2024, 11, 3)));

    // a second freeze stacks on the first
    let outcome = freeze_service()
        .freeze(&tenant, sub.id, freeze_req(date(2024, 12, 20), date(2024, 12, 20)))
        .await
        .unwrap();
    assert_eq!(outcome.subscription.freeze_days_remaining, 4);
    assert_eq!(outcome.subscription.version, 2);
}

#[tokio::test]
async fn test_freeze_unknown_subscription() {
    let (tenant, _) = setup_tenant(utc(2024, 10, 30, 9, 0), chrono_tz::Asia::Tashkent).await;
    let err = freeze_service()
        .freeze(&tenant, 12345, freeze_req(date(2024, 11, 1), date(2024, 11, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
