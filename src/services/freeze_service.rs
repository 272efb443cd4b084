use crate::database::TenantContext;
use crate::entities::{
    LessonStatus, group_student_entity as group_students, lesson_entity as lessons,
    lesson_student_entity as lesson_students, subscription_entity as subscriptions,
    subscription_freeze_entity as freezes,
};
use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::services::sinks::{ActivityEntry, ActivitySink, ActivityType, best_effort};
use crate::utils::time::{end_of_day_utc, shift_days_local, start_of_day_utc};
use chrono::NaiveDate;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FreezeSubscription {
    pub freeze_start: NaiveDate,
    pub freeze_end: NaiveDate,
    pub reason: Option<String>,
}

impl FreezeSubscription {
    /// Inclusive length of the freeze, never less than one day.
    pub fn days(&self) -> i32 {
        ((self.freeze_end - self.freeze_start).num_days() + 1).max(1) as i32
    }
}

#[derive(Debug, Clone)]
pub struct FreezeOutcome {
    pub subscription: subscriptions::Model,
    pub freeze: freezes::Model,
    pub freeze_days: i32,
    pub lessons_moved: usize,
}

#[derive(Clone)]
pub struct FreezeService {
    activity: Arc<dyn ActivitySink>,
}

impl FreezeService {
    pub fn new(activity: Arc<dyn ActivitySink>) -> Self {
        Self { activity }
    }

    /// 冻结订阅
    ///
    /// 冻结区间内该学生的所有未取消课程整体后移 N 天（N 为冻结天数，含首尾），
    /// 订阅结束日与缴费截止日同样顺延 N 天，冻结天数累加。
    /// Status is left as is: a frozen subscription stays `active`.
    pub async fn freeze(
        &self,
        tenant: &TenantContext,
        subscription_id: i64,
        req: FreezeSubscription,
    ) -> AppResult<FreezeOutcome> {
        let reason = req
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let now = tenant.now();
        let tz = tenant.timezone();

        let txn = tenant.db().begin().await?;
        let subscription = ledger::load_subscription(&txn, subscription_id).await?;

        if req.freeze_start < subscription.start_date {
            return Err(AppError::InvalidState(format!(
                "Freeze cannot start before the subscription starts ({})",
                subscription.start_date
            )));
        }
        if let Some(end_date) = subscription.end_date
            && req.freeze_end > end_date
        {
            return Err(AppError::InvalidState(format!(
                "Freeze cannot end after the subscription ends ({end_date})"
            )));
        }

        let days = req.days();
        let window_start = start_of_day_utc(&tz, req.freeze_start);
        let window_end = end_of_day_utc(&tz, req.freeze_end);
        let student_id = subscription.student_id;

        // 学生本人的课、点名册上的课、所在班级的课
        let enrolled = Query::select()
            .column(lesson_students::Column::LessonId)
            .from(lesson_students::Entity)
            .and_where(lesson_students::Column::StudentId.eq(student_id))
            .to_owned();
        let groups = Query::select()
            .column(group_students::Column::GroupId)
            .from(group_students::Entity)
            .and_where(group_students::Column::StudentId.eq(student_id))
            .and_where(group_students::Column::IsActive.eq(true))
            .to_owned();

        let affected = lessons::Entity::find()
            .filter(lessons::Column::Status.ne(LessonStatus::Cancelled))
            .filter(lessons::Column::StartTime.between(window_start, window_end))
            .filter(
                Condition::any()
                    .add(lessons::Column::StudentId.eq(student_id))
                    .add(lessons::Column::Id.in_subquery(enrolled))
                    .add(lessons::Column::GroupId.in_subquery(groups)),
            )
            .order_by_asc(lessons::Column::StartTime)
            .all(&txn)
            .await?;

        let lessons_moved = affected.len();
        for lesson in affected {
            let start_time = shift_days_local(&tz, lesson.start_time, days as i64);
            let end_time = shift_days_local(&tz, lesson.end_time, days as i64);
            let mut am = lesson.into_active_model();
            am.start_time = Set(start_time);
            am.end_time = Set(end_time);
            am.updated_at = Set(now);
            am.update(&txn).await?;
        }

        ledger::extend_for_freeze(&txn, &subscription, days, now).await?;

        let freeze = freezes::ActiveModel {
            subscription_id: Set(subscription.id),
            freeze_start: Set(req.freeze_start),
            freeze_end: Set(req.freeze_end),
            reason: Set(reason.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let updated = ledger::load_subscription(&txn, subscription.id).await?;
        txn.commit().await?;

        log::info!(
            "Subscription {} frozen {}..{} ({} days, {} lessons moved) tenant={}",
            updated.id,
            req.freeze_start,
            req.freeze_end,
            days,
            lessons_moved,
            tenant.slug()
        );

        let entry = ActivityEntry {
            student_id,
            activity_type: ActivityType::Freeze,
            description: format!(
                "Subscription #{} frozen from {} to {} ({days} days)",
                updated.id, req.freeze_start, req.freeze_end
            ),
            metadata: json!({
                "subscription_id": updated.id,
                "freeze_id": freeze.id,
                "freeze_days": days,
                "lessons_moved": lessons_moved,
                "end_date": updated.end_date,
                "paid_till": updated.paid_till,
                "reason": reason,
            }),
            actor_id: None,
        };
        best_effort("Activity log", self.activity.log(tenant, entry).await);

        Ok(FreezeOutcome {
            subscription: updated,
            freeze,
            freeze_days: days,
            lessons_moved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(start: (i32, u32, u32), end: (i32, u32, u32)) -> FreezeSubscription {
        FreezeSubscription {
            freeze_start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            freeze_end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            reason: None,
        }
    }

    #[test]
    fn test_freeze_days_inclusive() {
        assert_eq!(req((2024, 11, 1), (2024, 11, 7)).days(), 7);
        assert_eq!(req((2024, 11, 1), (2024, 11, 1)).days(), 1);
        assert_eq!(req((2024, 12, 30), (2025, 1, 2)).days(), 4);
    }

    #[test]
    fn test_freeze_days_never_below_one() {
        assert_eq!(req((2024, 11, 7), (2024, 11, 1)).days(), 1);
    }
}
