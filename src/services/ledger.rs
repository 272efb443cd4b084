//! Ledger access shared by the attendance and freeze engines.
//!
//! Every helper runs on the caller's transaction. Subscription mutations are
//! conditional on the `version` read earlier in the same transaction and bump it,
//! so a stale writer sees zero affected rows and must abort.

use crate::entities::{
    BalanceTransactionType, BillingType, SubscriptionStatus,
    balance_transaction_entity as balance_transactions, student_entity as students,
    subscription_consumption_entity as consumptions, subscription_entity as subscriptions,
    subscription_type_entity as subscription_types,
};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

/// A subscription together with the billing rules of its type.
#[derive(Debug, Clone)]
pub struct ActiveSubscription {
    pub subscription: subscriptions::Model,
    pub billing_type: BillingType,
}

/// 学生最新创建、仍有剩余课时的有效订阅
pub async fn find_active_subscription<C>(
    db: &C,
    student_id: i64,
) -> AppResult<Option<ActiveSubscription>>
where
    C: ConnectionTrait,
{
    let found = subscriptions::Entity::find()
        .find_also_related(subscription_types::Entity)
        .filter(subscriptions::Column::StudentId.eq(student_id))
        .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
        .filter(subscriptions::Column::RemainingUnits.gt(0))
        .order_by_desc(subscriptions::Column::CreatedAt)
        .order_by_desc(subscriptions::Column::Id)
        .one(db)
        .await?;

    match found {
        Some((subscription, Some(kind))) => Ok(Some(ActiveSubscription {
            subscription,
            billing_type: kind.billing_type,
        })),
        Some((subscription, None)) => Err(AppError::InternalError(format!(
            "Subscription {} references a missing type {}",
            subscription.id, subscription.type_id
        ))),
        None => Ok(None),
    }
}

/// Newest active subscription of the student, whether or not units remain.
pub async fn find_current_subscription<C>(
    db: &C,
    student_id: i64,
) -> AppResult<Option<subscriptions::Model>>
where
    C: ConnectionTrait,
{
    let found = subscriptions::Entity::find()
        .filter(subscriptions::Column::StudentId.eq(student_id))
        .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
        .order_by_desc(subscriptions::Column::CreatedAt)
        .order_by_desc(subscriptions::Column::Id)
        .one(db)
        .await?;
    Ok(found)
}

pub async fn load_subscription<C>(db: &C, subscription_id: i64) -> AppResult<subscriptions::Model>
where
    C: ConnectionTrait,
{
    subscriptions::Entity::find_by_id(subscription_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subscription {subscription_id} not found")))
}

/// 乐观锁扣减一个课时: `version` 与剩余课时在同一条 UPDATE 中校验。
///
/// Zero affected rows means another writer got there first or the bundle is
/// exhausted; the caller has to abort its transaction and retry from scratch.
pub async fn consume_unit<C>(
    db: &C,
    subscription: &subscriptions::Model,
    now: DateTime<Utc>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let result = subscriptions::Entity::update_many()
        .col_expr(
            subscriptions::Column::UsedUnits,
            Expr::col(subscriptions::Column::UsedUnits).add(1),
        )
        .col_expr(
            subscriptions::Column::RemainingUnits,
            Expr::col(subscriptions::Column::RemainingUnits).sub(1),
        )
        .col_expr(
            subscriptions::Column::Version,
            Expr::col(subscriptions::Column::Version).add(1),
        )
        .col_expr(subscriptions::Column::UpdatedAt, Expr::value(now))
        .filter(subscriptions::Column::Id.eq(subscription.id))
        .filter(subscriptions::Column::Version.eq(subscription.version))
        .filter(subscriptions::Column::RemainingUnits.gt(0))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::InvalidState(format!(
            "Subscription {} changed concurrently or has no remaining units, retry the request",
            subscription.id
        )));
    }
    Ok(())
}

/// Flips a subscription to `expired`; `expected_version` is the version after the last write.
pub async fn expire_subscription<C>(
    db: &C,
    subscription_id: i64,
    expected_version: i32,
    now: DateTime<Utc>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let result = subscriptions::Entity::update_many()
        .col_expr(
            subscriptions::Column::Status,
            Expr::value(SubscriptionStatus::Expired),
        )
        .col_expr(
            subscriptions::Column::Version,
            Expr::col(subscriptions::Column::Version).add(1),
        )
        .col_expr(subscriptions::Column::UpdatedAt, Expr::value(now))
        .filter(subscriptions::Column::Id.eq(subscription_id))
        .filter(subscriptions::Column::Version.eq(expected_version))
        .exec(db)
        .await?;

    ensure_versioned_write(result.rows_affected, subscription_id)
}

/// Excused absence: one more unit owed and one more day on the end/paid-till dates.
pub async fn extend_for_makeup<C>(
    db: &C,
    subscription: &subscriptions::Model,
    now: DateTime<Utc>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let one_day = Duration::days(1);
    let result = subscriptions::Entity::update_many()
        .col_expr(
            subscriptions::Column::TotalUnits,
            Expr::col(subscriptions::Column::TotalUnits).add(1),
        )
        .col_expr(
            subscriptions::Column::RemainingUnits,
            Expr::col(subscriptions::Column::RemainingUnits).add(1),
        )
        .col_expr(
            subscriptions::Column::EndDate,
            Expr::value(subscription.end_date.map(|d| d + one_day)),
        )
        .col_expr(
            subscriptions::Column::PaidTill,
            Expr::value(subscription.paid_till.map(|d| d + one_day)),
        )
        .col_expr(
            subscriptions::Column::Version,
            Expr::col(subscriptions::Column::Version).add(1),
        )
        .col_expr(subscriptions::Column::UpdatedAt, Expr::value(now))
        .filter(subscriptions::Column::Id.eq(subscription.id))
        .filter(subscriptions::Column::Version.eq(subscription.version))
        .exec(db)
        .await?;

    ensure_versioned_write(result.rows_affected, subscription.id)
}

/// Freeze: dates move forward by `days`, the freeze counter grows, status is untouched.
pub async fn extend_for_freeze<C>(
    db: &C,
    subscription: &subscriptions::Model,
    days: i32,
    now: DateTime<Utc>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let shift = Duration::days(days as i64);
    let result = subscriptions::Entity::update_many()
        .col_expr(
            subscriptions::Column::EndDate,
            Expr::value(subscription.end_date.map(|d| d + shift)),
        )
        .col_expr(
            subscriptions::Column::PaidTill,
            Expr::value(subscription.paid_till.map(|d| d + shift)),
        )
        .col_expr(
            subscriptions::Column::FreezeDaysRemaining,
            Expr::col(subscriptions::Column::FreezeDaysRemaining).add(days),
        )
        .col_expr(
            subscriptions::Column::Version,
            Expr::col(subscriptions::Column::Version).add(1),
        )
        .col_expr(subscriptions::Column::UpdatedAt, Expr::value(now))
        .filter(subscriptions::Column::Id.eq(subscription.id))
        .filter(subscriptions::Column::Version.eq(subscription.version))
        .exec(db)
        .await?;

    ensure_versioned_write(result.rows_affected, subscription.id)
}

fn ensure_versioned_write(rows_affected: u64, subscription_id: i64) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::InvalidState(format!(
            "Subscription {subscription_id} was modified concurrently, retry the request"
        )));
    }
    Ok(())
}

pub async fn consumption_exists<C>(db: &C, subscription_id: i64, attendance_id: i64) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let count = consumptions::Entity::find()
        .filter(consumptions::Column::SubscriptionId.eq(subscription_id))
        .filter(consumptions::Column::AttendanceId.eq(attendance_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Appends the consumption entry; `false` when one already exists for the pair.
pub async fn record_consumption<C>(
    db: &C,
    subscription_id: i64,
    attendance_id: i64,
    now: DateTime<Utc>,
) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    let entry = consumptions::ActiveModel {
        subscription_id: Set(subscription_id),
        attendance_id: Set(attendance_id),
        units: Set(1),
        created_at: Set(now),
        ..Default::default()
    };
    let inserted = consumptions::Entity::insert(entry)
        .on_conflict(
            OnConflict::columns([
                consumptions::Column::SubscriptionId,
                consumptions::Column::AttendanceId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

/// Debits the student's cash balance and writes a `deduction` ledger line.
///
/// Returns the balance after the debit.
pub async fn debit_balance<C>(
    db: &C,
    student_id: i64,
    amount: i64,
    subscription_id: i64,
    attendance_id: i64,
    description: String,
    now: DateTime<Utc>,
) -> AppResult<i64>
where
    C: ConnectionTrait,
{
    let result = students::Entity::update_many()
        .col_expr(
            students::Column::Balance,
            Expr::col(students::Column::Balance).sub(amount),
        )
        .col_expr(students::Column::UpdatedAt, Expr::value(now))
        .filter(students::Column::Id.eq(student_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Student {student_id} not found")));
    }

    let balance_after = students::Entity::find_by_id(student_id)
        .one(db)
        .await?
        .map(|s| s.balance)
        .ok_or_else(|| AppError::NotFound(format!("Student {student_id} not found")))?;

    balance_transactions::ActiveModel {
        student_id: Set(student_id),
        transaction_type: Set(BalanceTransactionType::Deduction),
        amount: Set(-amount),
        balance_after: Set(balance_after),
        subscription_id: Set(Some(subscription_id)),
        attendance_id: Set(Some(attendance_id)),
        description: Set(Some(description)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(balance_after)
}
