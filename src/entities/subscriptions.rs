use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Expired => write!(f, "expired"),
        }
    }
}

/// 学生购买的课时包。
///
/// `remaining_units` 始终与 `total_units - used_units` 同步写入；
/// 每次变更都会递增 `version`（乐观锁）。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub type_id: i64,
    pub total_units: i32,
    pub used_units: i32,
    pub remaining_units: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub paid_till: Option<NaiveDate>,
    /// Accumulated freeze days.
    pub freeze_days_remaining: i32,
    pub status: SubscriptionStatus,
    pub version: i32,
    pub price_per_unit: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subscription_types::Entity",
        from = "Column::TypeId",
        to = "super::subscription_types::Column::Id"
    )]
    SubscriptionType,
}

impl Related<super::subscription_types::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
