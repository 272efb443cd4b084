mod common;

use academy_backend::database::TenantContext;
use academy_backend::entities::{OccurrenceStatus, lesson_occurrence_entity as occurrences};
use academy_backend::error::AppError;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use common::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashSet;

async fn occurrences_of(tenant: &TenantContext, rule_id: i64) -> Vec<occurrences::Model> {
    occurrences::Entity::find()
        .filter(occurrences::Column::RuleId.eq(rule_id))
        .order_by_asc(occurrences::Column::StartsAt)
        .all(tenant.db())
        .await
        .unwrap()
}

async fn set_status(tenant: &TenantContext, rule_id: i64, starts_at: DateTime<Utc>, status: OccurrenceStatus) {
    occurrences::Entity::update_many()
        .col_expr(occurrences::Column::Status, Expr::value(status))
        .filter(occurrences::Column::RuleId.eq(rule_id))
        .filter(occurrences::Column::StartsAt.eq(starts_at))
        .exec(tenant.db())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_generate_occurrences_for_weekly_rule() {
    let (tenant, _) = setup_tenant(utc(2023, 12, 20, 9, 0), chrono_tz::UTC).await;
    let rule = seed_rule(
        &tenant,
        "FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=18;BYMINUTE=30",
        utc(2024, 1, 1, 0, 0),
        None,
        "UTC",
    )
    .await;

    let created = schedule_service()
        .generate_occurrences(&tenant, &rule, Some(14))
        .await
        .unwrap();
    assert_eq!(created, 5);

    let rows = occurrences_of(&tenant, rule.id).await;
    let days: Vec<u32> = rows.iter().map(|o| o.starts_at.day()).collect();
    assert_eq!(days, vec![1, 3, 8, 10, 15]);
    for o in &rows {
        assert!(matches!(o.starts_at.weekday(), Weekday::Mon | Weekday::Wed));
        assert_eq!((o.starts_at.hour(), o.starts_at.minute()), (18, 30));
        assert_eq!(o.ends_at - o.starts_at, Duration::minutes(90));
        assert_eq!(o.status, OccurrenceStatus::Scheduled);
    }
}

#[tokio::test]
async fn test_generate_occurrences_in_rule_timezone() {
    let (tenant, _) = setup_tenant(utc(2024, 2, 20, 9, 0), chrono_tz::UTC).await;
    // 09:00 Tashkent
    let rule = seed_rule(&tenant, "FREQ=DAILY", utc(2024, 3, 1, 4, 0), None, "Asia/Tashkent").await;

    let created = schedule_service()
        .generate_occurrences(&tenant, &rule, Some(6))
        .await
        .unwrap();
    assert_eq!(created, 7);
    let rows = occurrences_of(&tenant, rule.id).await;
    assert!(rows.iter().all(|o| o.starts_at.hour() == 4));
}

#[tokio::test]
async fn test_regenerate_keeps_past_and_finished_occurrences() {
    let (tenant, _) = setup_tenant(utc(2024, 1, 5, 12, 0), chrono_tz::UTC).await;
    let rule = seed_rule(&tenant, "FREQ=DAILY;BYHOUR=10", utc(2024, 1, 1, 0, 0), None, "UTC").await;
    let service = schedule_service();
    service.generate_occurrences(&tenant, &rule, Some(9)).await.unwrap();

    let before = occurrences_of(&tenant, rule.id).await;
    assert_eq!(before.len(), 10);
    set_status(&tenant, rule.id, utc(2024, 1, 2, 10, 0), OccurrenceStatus::Done).await;
    set_status(&tenant, rule.id, utc(2024, 1, 7, 10, 0), OccurrenceStatus::Done).await;
    set_status(&tenant, rule.id, utc(2024, 1, 8, 10, 0), OccurrenceStatus::Cancelled).await;

    let summary = service
        .regenerate_future(&tenant, rule.id, utc(2024, 1, 6, 0, 0), Some(4))
        .await
        .unwrap();
    assert_eq!(summary.deleted, 3);
    assert_eq!(summary.created, 3);

    let after = occurrences_of(&tenant, rule.id).await;
    assert_eq!(after.len(), 10);

    // rows before from_time are untouched
    let early_before: Vec<i64> = before.iter().take(5).map(|o| o.id).collect();
    let early_after: Vec<i64> = after.iter().take(5).map(|o| o.id).collect();
    assert_eq!(early_before, early_after);

    let kept: Vec<(u32, OccurrenceStatus)> = after
        .iter()
        .filter(|o| o.status != OccurrenceStatus::Scheduled)
        .map(|o| (o.starts_at.day(), o.status))
        .collect();
    assert_eq!(
        kept,
        vec![
            (2, OccurrenceStatus::Done),
            (7, OccurrenceStatus::Done),
            (8, OccurrenceStatus::Cancelled),
        ]
    );

    let starts: HashSet<DateTime<Utc>> = after.iter().map(|o| o.starts_at).collect();
    assert_eq!(starts.len(), after.len());
}

#[tokio::test]
async fn test_regenerate_is_repeatable() {
    let (tenant, _) = setup_tenant(utc(2024, 1, 5, 12, 0), chrono_tz::UTC).await;
    let rule = seed_rule(&tenant, "FREQ=WEEKLY;BYDAY=TU,TH;BYHOUR=16", utc(2024, 1, 1, 0, 0), None, "UTC").await;
    let service = schedule_service();

    let first = service
        .regenerate_future(&tenant, rule.id, utc(2024, 1, 5, 12, 0), Some(14))
        .await
        .unwrap();
    assert_eq!(first.deleted, 0);
    assert_eq!(first.created, 4);

    let second = service
        .regenerate_future(&tenant, rule.id, utc(2024, 1, 5, 12, 0), Some(14))
        .await
        .unwrap();
    assert_eq!(second.deleted, 4);
    assert_eq!(second.created, 4);
    assert_eq!(occurrences_of(&tenant, rule.id).await.len(), 4);
}

#[tokio::test]
async fn test_regenerate_unknown_rule() {
    let (tenant, _) = setup_tenant(utc(2024, 1, 5, 12, 0), chrono_tz::UTC).await;
    let err = schedule_service()
        .regenerate_future(&tenant, 404, utc(2024, 1, 5, 12, 0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_generate_for_all_active_rules_is_idempotent() {
    let (tenant, _) = setup_tenant(utc(2024, 3, 10, 9, 0), chrono_tz::UTC).await;
    let fresh = seed_rule(&tenant, "FREQ=DAILY;BYHOUR=10", utc(2024, 1, 1, 0, 0), None, "UTC").await;
    let ended = seed_rule(
        &tenant,
        "FREQ=DAILY;BYHOUR=10",
        utc(2024, 1, 1, 0, 0),
        Some(utc(2024, 2, 1, 0, 0)),
        "UTC",
    )
    .await;
    let covered = seed_rule(&tenant, "FREQ=WEEKLY;BYDAY=TU;BYHOUR=10", utc(2024, 1, 1, 0, 0), None, "UTC").await;
    seed_occurrence(&tenant, covered.id, utc(2024, 3, 12, 10, 0), OccurrenceStatus::Scheduled).await;

    let service = schedule_service();
    let summary = service
        .generate_for_all_active_rules(&tenant, Some(7))
        .await
        .unwrap();
    assert_eq!(summary.rules_expanded, 1);
    assert_eq!(summary.rules_skipped, 1);
    assert_eq!(summary.rules_failed, 0);
    assert_eq!(summary.occurrences_created, 8);

    let rows = occurrences_of(&tenant, fresh.id).await;
    assert_eq!(rows.first().map(|o| o.starts_at), Some(utc(2024, 3, 10, 10, 0)));
    assert_eq!(rows.last().map(|o| o.starts_at), Some(utc(2024, 3, 17, 10, 0)));
    assert!(occurrences_of(&tenant, ended.id).await.is_empty());
    assert_eq!(occurrences_of(&tenant, covered.id).await.len(), 1);

    let again = service
        .generate_for_all_active_rules(&tenant, Some(7))
        .await
        .unwrap();
    assert_eq!(again.rules_expanded, 0);
    assert_eq!(again.rules_skipped, 2);
    assert_eq!(again.occurrences_created, 0);
    assert_eq!(occurrences_of(&tenant, fresh.id).await.len(), 8);
}

#[tokio::test]
async fn test_cleanup_past_removes_only_old_finished_occurrences() {
    let (tenant, _) = setup_tenant(utc(2024, 3, 10, 9, 0), chrono_tz::UTC).await;
    let rule = seed_rule(&tenant, "FREQ=DAILY;BYHOUR=10", utc(2024, 1, 1, 0, 0), None, "UTC").await;
    let old_done = seed_occurrence(&tenant, rule.id, utc(2024, 1, 1, 10, 0), OccurrenceStatus::Done).await;
    let old_cancelled = seed_occurrence(&tenant, rule.id, utc(2024, 1, 2, 10, 0), OccurrenceStatus::Cancelled).await;
    let old_scheduled = seed_occurrence(&tenant, rule.id, utc(2024, 1, 3, 10, 0), OccurrenceStatus::Scheduled).await;
    let recent_done = seed_occurrence(&tenant, rule.id, utc(2024, 3, 5, 10, 0), OccurrenceStatus::Done).await;

    let service = schedule_service();
    let deleted = service.cleanup_past(&tenant, 30).await.unwrap();
    assert_eq!(deleted, 2);

    let left: Vec<i64> = occurrences_of(&tenant, rule.id).await.iter().map(|o| o.id).collect();
    assert_eq!(left, vec![old_scheduled.id, recent_done.id]);
    assert!(!left.contains(&old_done.id));
    assert!(!left.contains(&old_cancelled.id));

    assert_eq!(service.cleanup_past(&tenant, 30).await.unwrap(), 0);
    let err = service.cleanup_past(&tenant, -1).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_oversized_day_counts_are_rejected() {
    let (tenant, _) = setup_tenant(utc(2024, 3, 10, 9, 0), chrono_tz::UTC).await;
    let rule = seed_rule(&tenant, "FREQ=DAILY;BYHOUR=10", utc(2024, 1, 1, 0, 0), None, "UTC").await;
    let service = schedule_service();

    let err = service
        .generate_occurrences(&tenant, &rule, Some(1_000_000_000))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let err = service
        .regenerate_future(&tenant, rule.id, utc(2024, 3, 10, 9, 0), Some(i64::MAX / 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let err = service
        .generate_for_all_active_rules(&tenant, Some(i64::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(occurrences_of(&tenant, rule.id).await.is_empty());

    let err = service.cleanup_past(&tenant, i64::MAX / 2).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_generation_stops_at_rule_end_time() {
    let (tenant, _) = setup_tenant(utc(2023, 12, 20, 9, 0), chrono_tz::UTC).await;
    let rule = seed_rule(
        &tenant,
        "FREQ=DAILY;BYHOUR=18",
        utc(2024, 1, 1, 0, 0),
        Some(utc(2024, 1, 3, 9, 0)),
        "UTC",
    )
    .await;

    let created = schedule_service()
        .generate_occurrences(&tenant, &rule, None)
        .await
        .unwrap();
    assert_eq!(created, 2);
    let rows = occurrences_of(&tenant, rule.id).await;
    assert!(rows.iter().all(|o| o.starts_at <= utc(2024, 1, 3, 9, 0)));
}
