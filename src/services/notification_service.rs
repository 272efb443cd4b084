use crate::database::TenantContext;
use crate::entities::notification_entity as notifications;
use crate::error::AppResult;
use crate::services::sinks::{NotificationSink, NotificationType};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

/// Stores student alerts in the tenant database.
#[derive(Clone, Default)]
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn create(
        &self,
        tenant: &TenantContext,
        student_id: i64,
        kind: NotificationType,
        message: &str,
    ) -> AppResult<()> {
        notifications::ActiveModel {
            student_id: Set(student_id),
            notification_type: Set(kind.as_str().to_string()),
            message: Set(message.to_string()),
            is_read: Set(false),
            created_at: Set(tenant.now()),
            ..Default::default()
        }
        .insert(tenant.db())
        .await?;
        Ok(())
    }

    async fn exists_unread(
        &self,
        tenant: &TenantContext,
        student_id: i64,
        kind: NotificationType,
    ) -> AppResult<bool> {
        let count = notifications::Entity::find()
            .filter(notifications::Column::StudentId.eq(student_id))
            .filter(notifications::Column::NotificationType.eq(kind.as_str()))
            .filter(notifications::Column::IsRead.eq(false))
            .count(tenant.db())
            .await?;
        Ok(count > 0)
    }
}
