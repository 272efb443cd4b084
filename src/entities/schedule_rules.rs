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
pub enum RuleOwnerType {
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "group")]
    Group,
    #[sea_orm(string_value = "room")]
    Room,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "schedule_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_type: RuleOwnerType,
    pub owner_id: i64,
    /// e.g. `FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=18;BYMINUTE=30`
    pub recurrence_expr: String,
    pub window_start: DateTime<Utc>,
    pub window_end: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub timezone: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
