use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{SubscriptionStatus, subscription_entity};
use crate::services::{FreezeOutcome, FreezeSubscription};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct FreezeRequest {
    pub freeze_start: NaiveDate,
    /// Inclusive.
    pub freeze_end: NaiveDate,
    pub reason: Option<String>,
}

impl From<FreezeRequest> for FreezeSubscription {
    fn from(r: FreezeRequest) -> Self {
        Self {
            freeze_start: r.freeze_start,
            freeze_end: r.freeze_end,
            reason: r.reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: i64,
    pub student_id: i64,
    pub type_id: i64,
    pub total_units: i32,
    pub used_units: i32,
    pub remaining_units: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub paid_till: Option<NaiveDate>,
    pub freeze_days_remaining: i32,
    pub status: SubscriptionStatus,
    pub version: i32,
    pub price_per_unit: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl From<subscription_entity::Model> for SubscriptionResponse {
    fn from(m: subscription_entity::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            type_id: m.type_id,
            total_units: m.total_units,
            used_units: m.used_units,
            remaining_units: m.remaining_units,
            start_date: m.start_date,
            end_date: m.end_date,
            paid_till: m.paid_till,
            freeze_days_remaining: m.freeze_days_remaining,
            status: m.status,
            version: m.version,
            price_per_unit: m.price_per_unit,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FreezeResponse {
    pub subscription: SubscriptionResponse,
    pub freeze_id: i64,
    pub freeze_days: i32,
    /// 被顺延的课程数
    pub lessons_moved: usize,
}

impl From<FreezeOutcome> for FreezeResponse {
    fn from(o: FreezeOutcome) -> Self {
        Self {
            subscription: o.subscription.into(),
            freeze_id: o.freeze.id,
            freeze_days: o.freeze_days,
            lessons_moved: o.lessons_moved,
        }
    }
}
