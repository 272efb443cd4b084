//! Materialises lesson occurrences from schedule rules.

use crate::database::TenantContext;
use crate::entities::{
    OccurrenceStatus, lesson_occurrence_entity as occurrences,
    schedule_rule_entity as schedule_rules,
};
use crate::error::{AppError, AppResult};
use crate::utils::recurrence::Recurrence;
use crate::utils::time::{local_date, local_to_utc, parse_timezone, start_of_day_utc, to_local};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::collections::HashSet;

pub const DEFAULT_DAYS_AHEAD: i64 = 90;
/// Upper bound for `days_ahead` and `older_than_days` (about ten years).
pub const MAX_DAYS: i64 = 3660;

/// Start/end instant of one occurrence.
pub type Slot = (DateTime<Utc>, DateTime<Utc>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenerateSummary {
    pub deleted: u64,
    pub created: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub rules_expanded: usize,
    pub rules_skipped: usize,
    pub rules_failed: usize,
    pub occurrences_created: usize,
}

/// Plans the occurrences of `rule` from the local date of `origin` on.
///
/// The window runs `days_ahead` local days past `origin`, cut at the rule's
/// end date; both ends are inclusive and nothing starts after the rule's end.
/// `days_ahead` is clamped to `0..=MAX_DAYS`. `fallback_tz` is used when the
/// rule's own timezone does not parse.
pub fn plan_occurrences(
    rule: &schedule_rules::Model,
    origin: DateTime<Utc>,
    days_ahead: i64,
    fallback_tz: Tz,
) -> Vec<Slot> {
    let tz = parse_timezone(&rule.timezone, fallback_tz);
    let recurrence = Recurrence::parse(&rule.recurrence_expr);
    let time = recurrence.time_of_day(to_local(&tz, rule.window_start).time());

    let first_day = local_date(&tz, origin);
    let mut last_day = first_day + Duration::days(days_ahead.clamp(0, MAX_DAYS));
    if let Some(window_end) = rule.window_end {
        last_day = last_day.min(local_date(&tz, window_end));
    }

    let duration = Duration::minutes(rule.duration_minutes as i64);
    recurrence
        .expand(first_day, last_day, time)
        .into_iter()
        .map(|local| local_to_utc(&tz, local))
        .filter(|start| rule.window_end.is_none_or(|end| *start <= end))
        .map(|start| (start, start + duration))
        .collect()
}

#[derive(Clone)]
pub struct ScheduleService {
    default_days_ahead: i64,
}

impl Default for ScheduleService {
    fn default() -> Self {
        Self::new(DEFAULT_DAYS_AHEAD)
    }
}

impl ScheduleService {
    pub fn new(default_days_ahead: i64) -> Self {
        Self { default_days_ahead }
    }

    fn days_ahead(&self, days_ahead: Option<i64>) -> AppResult<i64> {
        let days = days_ahead.unwrap_or(self.default_days_ahead);
        check_days("days_ahead", days)?;
        Ok(days)
    }

    pub async fn find_rule(
        &self,
        tenant: &TenantContext,
        rule_id: i64,
    ) -> AppResult<schedule_rules::Model> {
        schedule_rules::Entity::find_by_id(rule_id)
            .one(tenant.db())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Schedule rule {rule_id} not found")))
    }

    /// 按规则生成未来课次（从规则开始时间起，默认 90 天），一次批量插入
    pub async fn generate_occurrences(
        &self,
        tenant: &TenantContext,
        rule: &schedule_rules::Model,
        days_ahead: Option<i64>,
    ) -> AppResult<usize> {
        let days = self.days_ahead(days_ahead)?;
        let slots = plan_occurrences(rule, rule.window_start, days, tenant.timezone());

        let txn = tenant.db().begin().await?;
        let created = insert_occurrences(&txn, rule.id, &slots, tenant.now()).await?;
        txn.commit().await?;

        log::info!(
            "Generated {created} occurrences for rule {} (tenant={}, days_ahead={days})",
            rule.id,
            tenant.slug()
        );
        Ok(created)
    }

    /// 删除 from_time 之后尚未开始的课次并重新生成
    ///
    /// Only `scheduled` occurrences are removed; done/cancelled ones survive and
    /// their slots are not generated again.
    pub async fn regenerate_future(
        &self,
        tenant: &TenantContext,
        rule_id: i64,
        from_time: DateTime<Utc>,
        days_ahead: Option<i64>,
    ) -> AppResult<RegenerateSummary> {
        let days = self.days_ahead(days_ahead)?;
        let txn = tenant.db().begin().await?;

        let rule = schedule_rules::Entity::find_by_id(rule_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Schedule rule {rule_id} not found")))?;

        let deleted = occurrences::Entity::delete_many()
            .filter(occurrences::Column::RuleId.eq(rule.id))
            .filter(occurrences::Column::StartsAt.gte(from_time))
            .filter(occurrences::Column::Status.eq(OccurrenceStatus::Scheduled))
            .exec(&txn)
            .await?
            .rows_affected;

        let survivors: HashSet<DateTime<Utc>> = occurrences::Entity::find()
            .filter(occurrences::Column::RuleId.eq(rule.id))
            .filter(occurrences::Column::StartsAt.gte(from_time))
            .all(&txn)
            .await?
            .into_iter()
            .map(|o| o.starts_at)
            .collect();

        let origin = from_time.max(rule.window_start);
        let slots: Vec<Slot> = plan_occurrences(&rule, origin, days, tenant.timezone())
            .into_iter()
            .filter(|(start, _)| *start >= from_time && !survivors.contains(start))
            .collect();

        let created = insert_occurrences(&txn, rule.id, &slots, tenant.now()).await?;
        txn.commit().await?;

        log::info!(
            "Regenerated rule {} from {from_time}: {deleted} removed, {created} created (tenant={})",
            rule.id,
            tenant.slug()
        );
        Ok(RegenerateSummary { deleted, created })
    }

    /// 为所有未结束且没有未来课次的规则补齐课次
    ///
    /// A rule that already has a future occurrence is skipped, so repeated runs
    /// do not duplicate anything. One failing rule does not stop the batch.
    pub async fn generate_for_all_active_rules(
        &self,
        tenant: &TenantContext,
        days_ahead: Option<i64>,
    ) -> AppResult<BatchSummary> {
        let days = self.days_ahead(days_ahead)?;
        let now = tenant.now();
        let today_start = start_of_day_utc(&tenant.timezone(), tenant.today());

        let rules = schedule_rules::Entity::find()
            .filter(
                Condition::any()
                    .add(schedule_rules::Column::WindowEnd.is_null())
                    .add(schedule_rules::Column::WindowEnd.gt(now)),
            )
            .order_by_asc(schedule_rules::Column::Id)
            .all(tenant.db())
            .await?;

        let mut summary = BatchSummary::default();
        for rule in rules {
            let upcoming = occurrences::Entity::find()
                .filter(occurrences::Column::RuleId.eq(rule.id))
                .filter(occurrences::Column::StartsAt.gte(now))
                .count(tenant.db())
                .await?;
            if upcoming > 0 {
                summary.rules_skipped += 1;
                continue;
            }

            let origin = rule.window_start.max(today_start);
            let slots = plan_occurrences(&rule, origin, days, tenant.timezone());
            match insert_occurrences(tenant.db(), rule.id, &slots, now).await {
                Ok(created) => {
                    summary.rules_expanded += 1;
                    summary.occurrences_created += created;
                }
                Err(e) => {
                    summary.rules_failed += 1;
                    log::error!(
                        "Failed to generate occurrences for rule {} (tenant={}): {e}",
                        rule.id,
                        tenant.slug()
                    );
                }
            }
        }

        log::info!(
            "Schedule batch for tenant {}: {} expanded, {} skipped, {} failed, {} occurrences",
            tenant.slug(),
            summary.rules_expanded,
            summary.rules_skipped,
            summary.rules_failed,
            summary.occurrences_created
        );
        Ok(summary)
    }

    /// 清理早于 N 天且已结束（done/cancelled）的课次
    pub async fn cleanup_past(&self, tenant: &TenantContext, older_than_days: i64) -> AppResult<u64> {
        check_days("older_than_days", older_than_days)?;
        let cutoff = tenant.now() - Duration::days(older_than_days);

        let deleted = occurrences::Entity::delete_many()
            .filter(occurrences::Column::StartsAt.lt(cutoff))
            .filter(
                occurrences::Column::Status
                    .is_in([OccurrenceStatus::Done, OccurrenceStatus::Cancelled]),
            )
            .exec(tenant.db())
            .await?
            .rows_affected;

        if deleted > 0 {
            log::info!(
                "Removed {deleted} finished occurrences older than {cutoff} (tenant={})",
                tenant.slug()
            );
        }
        Ok(deleted)
    }
}

fn check_days(name: &str, days: i64) -> AppResult<()> {
    if !(0..=MAX_DAYS).contains(&days) {
        return Err(AppError::ValidationError(format!(
            "{name} must be between 0 and {MAX_DAYS}, got {days}"
        )));
    }
    Ok(())
}

async fn insert_occurrences<C>(
    db: &C,
    rule_id: i64,
    slots: &[Slot],
    now: DateTime<Utc>,
) -> AppResult<usize>
where
    C: ConnectionTrait,
{
    if slots.is_empty() {
        return Ok(0);
    }
    let rows = slots.iter().map(|(starts_at, ends_at)| occurrences::ActiveModel {
        rule_id: Set(rule_id),
        starts_at: Set(*starts_at),
        ends_at: Set(*ends_at),
        status: Set(OccurrenceStatus::Scheduled),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    });
    occurrences::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(slots.len())
}
