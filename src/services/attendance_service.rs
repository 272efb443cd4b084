use crate::database::TenantContext;
use crate::entities::{
    AttendanceStatus, LessonStatus, attendance_entity as attendances, lesson_entity as lessons,
    lesson_student_entity as lesson_students, student_entity as students,
    subscription_entity as subscriptions,
};
use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::services::sinks::{
    AbsenceNotice, ActivityEntry, ActivitySink, ActivityType, EmailSender, NotificationSink,
    NotificationType, best_effort,
};
use crate::utils::time::{local_date, local_to_utc, to_local};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use sea_orm::sea_query::OnConflict;
use serde_json::json;
use std::sync::Arc;

/// 一次点名请求
#[derive(Debug, Clone)]
pub struct MarkAttendance {
    pub lesson_id: i64,
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub actor_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AttendanceOutcome {
    pub attendance: attendances::Model,
    /// A unit and/or cash was charged by this call.
    pub deducted: bool,
    pub remaining_units: Option<i32>,
    pub subscription_expired: bool,
    pub makeup_lesson_id: Option<i64>,
}

/// What one call charged, applied after the attendance row exists.
struct Charge {
    subscription_id: i64,
    unit_consumed: bool,
    price: Option<i64>,
    balance_after: Option<i64>,
    remaining_units: Option<i32>,
    expired: bool,
}

struct MakeupBooking {
    lesson: lessons::Model,
    subscription_id: i64,
    end_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct AttendanceService {
    notifications: Arc<dyn NotificationSink>,
    activity: Arc<dyn ActivitySink>,
    mailer: Arc<dyn EmailSender>,
    low_balance_threshold: i32,
}

impl AttendanceService {
    pub fn new(
        notifications: Arc<dyn NotificationSink>,
        activity: Arc<dyn ActivitySink>,
        mailer: Arc<dyn EmailSender>,
        low_balance_threshold: i32,
    ) -> Self {
        Self {
            notifications,
            activity,
            mailer,
            low_balance_threshold,
        }
    }

    /// 点名并结算课时
    ///
    /// 逻辑:
    /// 1. 课程开始前不允许点名
    /// 2. 出勤或无故缺勤: 扣减最新有效订阅的一个课时（乐观锁），按单价扣余额，
    ///    课时用完则订阅过期，余量不足时提醒
    /// 3. 请假（有理由的缺勤）: 订阅加一个课时并顺延一天，安排补课
    /// 4. 写入/更新点名记录和课时消耗记录
    /// 5. 提交后再发通知、写操作日志、发缺勤邮件（失败只记日志）
    ///
    /// A mark that was already charged is never charged again, so re-sending the
    /// same request is safe.
    pub async fn mark_attendance(
        &self,
        tenant: &TenantContext,
        cmd: MarkAttendance,
    ) -> AppResult<AttendanceOutcome> {
        // 原样保存理由，只有恰好为 `unexcused` 才按无故缺勤处理
        let reason = cmd.reason.clone().filter(|r| !r.trim().is_empty());
        let now = tenant.now();

        let txn = tenant.db().begin().await?;

        let lesson = lessons::Entity::find_by_id(cmd.lesson_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lesson {} not found", cmd.lesson_id)))?;
        let student = students::Entity::find_by_id(cmd.student_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", cmd.student_id)))?;

        if lesson.start_time > now {
            return Err(AppError::InvalidState(format!(
                "Lesson {} starts at {}, attendance cannot be marked before it begins",
                lesson.id,
                to_local(&tenant.timezone(), lesson.start_time)
            )));
        }

        let existing = attendances::Entity::find()
            .filter(attendances::Column::LessonId.eq(lesson.id))
            .filter(attendances::Column::StudentId.eq(student.id))
            .one(&txn)
            .await?;

        let selected = if cmd.status.triggers_deduction(reason.as_deref())
            && !existing.as_ref().is_some_and(|a| a.was_deducted())
        {
            select_subscription(&txn, student.id, existing.as_ref()).await?
        } else {
            None
        };

        let makeup = if cmd.status.is_excused_absence(reason.as_deref()) {
            if existing.as_ref().is_some_and(|a| a.was_excused_absence()) {
                log::info!(
                    "Excused absence of student {} for lesson {} already recorded, no new make-up",
                    student.id,
                    lesson.id
                );
                None
            } else {
                book_makeup(&txn, tenant, &lesson, student.id, now).await?
            }
        } else {
            None
        };

        let subscription_id = selected
            .as_ref()
            .map(|a| a.subscription.id)
            .or_else(|| existing.as_ref().and_then(|a| a.subscription_id));

        let attendance = match existing {
            Some(previous) => {
                let mut am = previous.into_active_model();
                am.status = Set(cmd.status);
                am.reason = Set(reason.clone());
                am.notes = Set(cmd.notes.clone());
                am.subscription_id = Set(subscription_id);
                am.marked_by = Set(cmd.actor_id);
                am.marked_at = Set(now);
                am.update(&txn).await?
            }
            None => {
                let row = attendances::ActiveModel {
                    lesson_id: Set(lesson.id),
                    student_id: Set(student.id),
                    subscription_id: Set(subscription_id),
                    status: Set(cmd.status),
                    reason: Set(reason.clone()),
                    notes: Set(cmd.notes.clone()),
                    marked_by: Set(cmd.actor_id),
                    marked_at: Set(now),
                    ..Default::default()
                };
                insert_or_update_attendance(&txn, row, lesson.id, student.id).await?
            }
        };

        let charge = match selected {
            Some(active) => {
                Some(apply_charge(&txn, &lesson, student.id, active, attendance.id, now).await?)
            }
            None => None,
        };

        txn.commit().await?;

        log::info!(
            "Attendance marked: tenant={} lesson={} student={} status={} charged={}",
            tenant.slug(),
            lesson.id,
            student.id,
            attendance.status,
            charge.is_some()
        );

        // 以下均为提交后的附带动作
        if let Some(charge) = &charge {
            self.send_balance_alerts(tenant, student.id, charge).await;
        }
        self.log_activities(
            tenant,
            &lesson,
            &attendance,
            charge.as_ref(),
            makeup.as_ref(),
            cmd.actor_id,
        )
        .await;
        if attendance.status == AttendanceStatus::Missed {
            self.spawn_absence_email(tenant, &student, &lesson, attendance.reason.clone());
        }

        Ok(AttendanceOutcome {
            deducted: charge.is_some(),
            remaining_units: charge.as_ref().and_then(|c| c.remaining_units),
            subscription_expired: charge.as_ref().is_some_and(|c| c.expired),
            makeup_lesson_id: makeup.map(|m| m.lesson.id),
            attendance,
        })
    }

    async fn send_balance_alerts(&self, tenant: &TenantContext, student_id: i64, charge: &Charge) {
        let Some(remaining) = charge.remaining_units else {
            return;
        };

        if charge.expired {
            let message = format!(
                "Subscription #{} has no lessons left and has expired",
                charge.subscription_id
            );
            best_effort(
                "Expiry notification",
                self.notifications
                    .create(
                        tenant,
                        student_id,
                        NotificationType::SubscriptionExpired,
                        &message,
                    )
                    .await,
            );
        } else if remaining <= self.low_balance_threshold {
            let result = self
                .notify_low_balance(tenant, student_id, charge.subscription_id, remaining)
                .await;
            best_effort("Low balance notification", result);
        }
    }

    async fn notify_low_balance(
        &self,
        tenant: &TenantContext,
        student_id: i64,
        subscription_id: i64,
        remaining: i32,
    ) -> AppResult<()> {
        let kind = NotificationType::SubscriptionExpiring;
        if self
            .notifications
            .exists_unread(tenant, student_id, kind)
            .await?
        {
            return Ok(());
        }
        let message = format!("Subscription #{subscription_id} has {remaining} lesson(s) left");
        self.notifications
            .create(tenant, student_id, kind, &message)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn log_activities(
        &self,
        tenant: &TenantContext,
        lesson: &lessons::Model,
        attendance: &attendances::Model,
        charge: Option<&Charge>,
        makeup: Option<&MakeupBooking>,
        actor_id: Option<i64>,
    ) {
        let mut entries = vec![ActivityEntry {
            student_id: attendance.student_id,
            activity_type: ActivityType::Attendance,
            description: format!("Marked {} for lesson \"{}\"", attendance.status, lesson.title),
            metadata: json!({
                "lesson_id": lesson.id,
                "attendance_id": attendance.id,
                "status": attendance.status,
                "reason": attendance.reason,
            }),
            actor_id,
        }];

        if let Some(charge) = charge {
            entries.push(ActivityEntry {
                student_id: attendance.student_id,
                activity_type: ActivityType::Payment,
                description: format!(
                    "Lesson \"{}\" charged to subscription #{}",
                    lesson.title, charge.subscription_id
                ),
                metadata: json!({
                    "subscription_id": charge.subscription_id,
                    "unit_consumed": charge.unit_consumed,
                    "remaining_units": charge.remaining_units,
                    "amount": charge.price,
                    "balance_after": charge.balance_after,
                }),
                actor_id,
            });
            if charge.expired {
                entries.push(ActivityEntry {
                    student_id: attendance.student_id,
                    activity_type: ActivityType::SubscriptionChange,
                    description: format!("Subscription #{} expired", charge.subscription_id),
                    metadata: json!({ "subscription_id": charge.subscription_id }),
                    actor_id,
                });
            }
        }

        if let Some(makeup) = makeup {
            entries.push(ActivityEntry {
                student_id: attendance.student_id,
                activity_type: ActivityType::SubscriptionChange,
                description: format!(
                    "Subscription #{} extended by one lesson, make-up lesson #{} booked",
                    makeup.subscription_id, makeup.lesson.id
                ),
                metadata: json!({
                    "subscription_id": makeup.subscription_id,
                    "end_date": makeup.end_date,
                    "makeup_lesson_id": makeup.lesson.id,
                    "makeup_start": makeup.lesson.start_time,
                }),
                actor_id,
            });
        }

        for entry in entries {
            best_effort("Activity log", self.activity.log(tenant, entry).await);
        }
    }

    fn spawn_absence_email(
        &self,
        tenant: &TenantContext,
        student: &students::Model,
        lesson: &lessons::Model,
        reason: Option<String>,
    ) {
        let Some(to) = student.email.clone().filter(|e| !e.trim().is_empty()) else {
            log::debug!("Student {} has no email, absence notice skipped", student.id);
            return;
        };

        let notice = AbsenceNotice {
            tenant: tenant.slug().to_string(),
            to,
            student_name: student.full_name.clone(),
            lesson_title: lesson.title.clone(),
            lesson_start: to_local(&tenant.timezone(), lesson.start_time),
            reason,
        };
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            best_effort(
                "Absence email",
                mailer.send_absence_notice(notice).await,
            );
        });
    }
}

/// 选出本次要扣费的订阅
///
/// None when the student has no subscription with capacity, when this
/// attendance already consumed a unit of it, or when the plan charges nothing.
async fn select_subscription(
    txn: &DatabaseTransaction,
    student_id: i64,
    existing: Option<&attendances::Model>,
) -> AppResult<Option<ledger::ActiveSubscription>> {
    let Some(active) = ledger::find_active_subscription(txn, student_id).await? else {
        log::info!(
            "Student {student_id} has no active subscription with remaining units, nothing charged"
        );
        return Ok(None);
    };
    let subscription = &active.subscription;

    // 同一点名记录已有消耗记录时视为已扣过
    if let Some(previous) = existing
        && ledger::consumption_exists(txn, subscription.id, previous.id).await?
    {
        log::info!(
            "Attendance {} already consumed a unit of subscription {}",
            previous.id,
            subscription.id
        );
        return Ok(None);
    }

    if !active.billing_type.decrements_units() && unit_price(subscription).is_none() {
        return Ok(None);
    }
    Ok(Some(active))
}

fn unit_price(subscription: &subscriptions::Model) -> Option<i64> {
    subscription.price_per_unit.filter(|p| *p > 0)
}

/// 扣课时（乐观锁）、扣余额、课时用完则过期、写消耗记录
///
/// The decrement is guarded by the version read in `select_subscription`; a
/// write that landed in between makes it fail and the whole call rolls back.
async fn apply_charge(
    txn: &DatabaseTransaction,
    lesson: &lessons::Model,
    student_id: i64,
    active: ledger::ActiveSubscription,
    attendance_id: i64,
    now: DateTime<Utc>,
) -> AppResult<Charge> {
    let subscription = active.subscription;
    let mut charge = Charge {
        subscription_id: subscription.id,
        unit_consumed: false,
        price: unit_price(&subscription),
        balance_after: None,
        remaining_units: None,
        expired: false,
    };

    if active.billing_type.decrements_units() {
        ledger::consume_unit(txn, &subscription, now).await?;
        charge.unit_consumed = true;
    }

    if let Some(price) = charge.price {
        let description = format!("Lesson {} ({})", lesson.id, lesson.title);
        charge.balance_after = Some(
            ledger::debit_balance(
                txn,
                student_id,
                price,
                subscription.id,
                attendance_id,
                description,
                now,
            )
            .await?,
        );
    }

    if charge.unit_consumed {
        let refreshed = ledger::load_subscription(txn, subscription.id).await?;
        if refreshed.remaining_units == 0 {
            ledger::expire_subscription(txn, refreshed.id, refreshed.version, now).await?;
            charge.expired = true;
        }
        charge.remaining_units = Some(refreshed.remaining_units);

        if !ledger::record_consumption(txn, subscription.id, attendance_id, now).await? {
            return Err(AppError::Conflict(format!(
                "Attendance {attendance_id} was already charged to subscription {}",
                subscription.id
            )));
        }
    }

    Ok(charge)
}

/// 首次点名写入；同一课程同一学生已被并发写入时按更新处理
async fn insert_or_update_attendance(
    txn: &DatabaseTransaction,
    row: attendances::ActiveModel,
    lesson_id: i64,
    student_id: i64,
) -> AppResult<attendances::Model> {
    attendances::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([attendances::Column::LessonId, attendances::Column::StudentId])
                .update_columns([
                    attendances::Column::SubscriptionId,
                    attendances::Column::Status,
                    attendances::Column::Reason,
                    attendances::Column::Notes,
                    attendances::Column::MarkedBy,
                    attendances::Column::MarkedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await
        .map_err(|e| AppError::from_db_write(e, "Attendance"))?;

    attendances::Entity::find()
        .filter(attendances::Column::LessonId.eq(lesson_id))
        .filter(attendances::Column::StudentId.eq(student_id))
        .one(txn)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!(
                "Attendance of student {student_id} for lesson {lesson_id} vanished after upsert"
            ))
        })
}

/// 请假补课: 订阅多一个课时并顺延一天，在新的结束日同一时刻安排补课
async fn book_makeup(
    txn: &DatabaseTransaction,
    tenant: &TenantContext,
    lesson: &lessons::Model,
    student_id: i64,
    now: DateTime<Utc>,
) -> AppResult<Option<MakeupBooking>> {
    let Some(subscription) = ledger::find_current_subscription(txn, student_id).await? else {
        log::warn!(
            "Student {student_id} has no active subscription, make-up for lesson {} not booked",
            lesson.id
        );
        return Ok(None);
    };

    let tz = tenant.timezone();
    let base = subscription
        .end_date
        .or(subscription.paid_till)
        .unwrap_or_else(|| local_date(&tz, lesson.start_time));
    let makeup_day = base + Duration::days(1);

    ledger::extend_for_makeup(txn, &subscription, now).await?;

    let start_time = local_to_utc(&tz, makeup_day.and_time(to_local(&tz, lesson.start_time).time()));
    let makeup = lessons::ActiveModel {
        title: Set(format!("Make-up: {}", lesson.title)),
        subject_id: Set(lesson.subject_id),
        teacher_id: Set(lesson.teacher_id),
        group_id: Set(lesson.group_id),
        student_id: Set(Some(student_id)),
        room_id: Set(lesson.room_id),
        start_time: Set(start_time),
        end_time: Set(start_time + lesson.duration()),
        status: Set(LessonStatus::Scheduled),
        is_makeup: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    lesson_students::ActiveModel {
        lesson_id: Set(makeup.id),
        student_id: Set(student_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok(Some(MakeupBooking {
        lesson: makeup,
        subscription_id: subscription.id,
        end_date: subscription.end_date.map(|_| makeup_day),
    }))
}
