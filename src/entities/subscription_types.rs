use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    /// 按课时扣减
    #[sea_orm(string_value = "per_lesson")]
    PerLesson,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "unlimited")]
    Unlimited,
}

impl BillingType {
    /// Only per-lesson bundles consume a unit for each chargeable attendance.
    pub fn decrements_units(self) -> bool {
        matches!(self, BillingType::PerLesson)
    }
}

impl std::fmt::Display for BillingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingType::PerLesson => write!(f, "per_lesson"),
            BillingType::Monthly => write!(f, "monthly"),
            BillingType::Unlimited => write!(f, "unlimited"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "subscription_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub billing_type: BillingType,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
