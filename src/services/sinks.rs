//! Collaborator seams the engines report to after commit.
//!
//! Failures here are never allowed to fail the primary operation; callers go
//! through [`best_effort`] which only logs.

use crate::database::TenantContext;
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    SubscriptionExpiring,
    SubscriptionExpired,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::SubscriptionExpiring => "subscription_expiring",
            NotificationType::SubscriptionExpired => "subscription_expired",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    Payment,
    Attendance,
    SubscriptionChange,
    Freeze,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Payment => "payment",
            ActivityType::Attendance => "attendance",
            ActivityType::SubscriptionChange => "subscription_change",
            ActivityType::Freeze => "freeze",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub student_id: i64,
    pub activity_type: ActivityType,
    pub description: String,
    pub metadata: serde_json::Value,
    pub actor_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbsenceNotice {
    pub tenant: String,
    pub to: String,
    pub student_name: String,
    pub lesson_title: String,
    /// Lesson start in the tenant's local time.
    pub lesson_start: NaiveDateTime,
    pub reason: Option<String>,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(
        &self,
        tenant: &TenantContext,
        student_id: i64,
        kind: NotificationType,
        message: &str,
    ) -> AppResult<()>;

    async fn exists_unread(
        &self,
        tenant: &TenantContext,
        student_id: i64,
        kind: NotificationType,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn log(&self, tenant: &TenantContext, entry: ActivityEntry) -> AppResult<()>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_absence_notice(&self, notice: AbsenceNotice) -> AppResult<()>;
}

/// Logs and swallows the error of a non-critical side effect.
pub fn best_effort(what: &str, result: AppResult<()>) {
    if let Err(e) = result {
        log::warn!("{what} failed (ignored): {e}");
    }
}
