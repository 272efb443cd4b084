use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Absence reason that is charged like an attended lesson.
pub const UNEXCUSED_REASON: &str = "unexcused";

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "attended")]
    Attended,
    #[sea_orm(string_value = "missed")]
    Missed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl AttendanceStatus {
    /// 出勤或无故缺勤都需要扣课时
    pub fn triggers_deduction(self, reason: Option<&str>) -> bool {
        match self {
            AttendanceStatus::Attended => true,
            AttendanceStatus::Missed => reason == Some(UNEXCUSED_REASON),
            AttendanceStatus::Cancelled => false,
        }
    }

    /// Missed with a non-empty reason other than `unexcused`.
    pub fn is_excused_absence(self, reason: Option<&str>) -> bool {
        self == AttendanceStatus::Missed
            && reason.is_some_and(|r| !r.is_empty() && r != UNEXCUSED_REASON)
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::Attended => write!(f, "attended"),
            AttendanceStatus::Missed => write!(f, "missed"),
            AttendanceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "attendances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lesson_id: i64,
    pub student_id: i64,
    pub subscription_id: Option<i64>,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub marked_by: Option<i64>,
    pub marked_at: DateTime<Utc>,
}

impl Model {
    /// Whether the stored mark has already been charged.
    pub fn was_deducted(&self) -> bool {
        self.status.triggers_deduction(self.reason.as_deref())
    }

    pub fn was_excused_absence(&self) -> bool {
        self.status.is_excused_absence(self.reason.as_deref())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduction_states() {
        assert!(AttendanceStatus::Attended.triggers_deduction(None));
        assert!(AttendanceStatus::Attended.triggers_deduction(Some("sick")));
        assert!(AttendanceStatus::Missed.triggers_deduction(Some("unexcused")));
        assert!(!AttendanceStatus::Missed.triggers_deduction(Some("sick")));
        assert!(!AttendanceStatus::Missed.triggers_deduction(None));
        assert!(!AttendanceStatus::Cancelled.triggers_deduction(Some("unexcused")));
    }

    #[test]
    fn test_unexcused_match_is_exact() {
        assert!(!AttendanceStatus::Missed.triggers_deduction(Some("Unexcused")));
        assert!(AttendanceStatus::Missed.is_excused_absence(Some("Unexcused")));
    }

    #[test]
    fn test_excused_absence() {
        assert!(AttendanceStatus::Missed.is_excused_absence(Some("sick")));
        assert!(!AttendanceStatus::Missed.is_excused_absence(Some("")));
        assert!(!AttendanceStatus::Missed.is_excused_absence(None));
        assert!(!AttendanceStatus::Missed.is_excused_absence(Some("unexcused")));
        assert!(!AttendanceStatus::Attended.is_excused_absence(Some("sick")));
    }
}
