use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::AttendanceStatus;
use crate::services::AttendanceOutcome;

/// 点名请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct MarkAttendanceRequest {
    pub student_id: i64,
    pub status: AttendanceStatus,
    /// Free-form absence reason; `unexcused` is charged like attendance.
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceResponse {
    pub id: i64,
    pub lesson_id: i64,
    pub student_id: i64,
    pub subscription_id: Option<i64>,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub marked_by: Option<i64>,
    pub marked_at: DateTime<Utc>,
    /// 本次请求是否扣了课时或余额
    pub deducted: bool,
    pub remaining_units: Option<i32>,
    pub subscription_expired: bool,
    /// 请假时安排的补课
    pub makeup_lesson_id: Option<i64>,
}

impl From<AttendanceOutcome> for AttendanceResponse {
    fn from(o: AttendanceOutcome) -> Self {
        let a = o.attendance;
        Self {
            id: a.id,
            lesson_id: a.lesson_id,
            student_id: a.student_id,
            subscription_id: a.subscription_id,
            status: a.status,
            reason: a.reason,
            notes: a.notes,
            marked_by: a.marked_by,
            marked_at: a.marked_at,
            deducted: o.deducted,
            remaining_units: o.remaining_units,
            subscription_expired: o.subscription_expired,
            makeup_lesson_id: o.makeup_lesson_id,
        }
    }
}
