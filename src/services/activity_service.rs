use crate::database::TenantContext;
use crate::entities::activity_log_entity as activity_logs;
use crate::error::AppResult;
use crate::services::sinks::{ActivityEntry, ActivitySink};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, Set};

/// Append-only student activity feed.
#[derive(Clone, Default)]
pub struct ActivityLogService;

impl ActivityLogService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActivitySink for ActivityLogService {
    async fn log(&self, tenant: &TenantContext, entry: ActivityEntry) -> AppResult<()> {
        let metadata = if entry.metadata.is_null() {
            None
        } else {
            Some(serde_json::to_string(&entry.metadata)?)
        };
        activity_logs::ActiveModel {
            student_id: Set(entry.student_id),
            activity_type: Set(entry.activity_type.as_str().to_string()),
            description: Set(entry.description),
            metadata: Set(metadata),
            actor_id: Set(entry.actor_id),
            created_at: Set(tenant.now()),
            ..Default::default()
        }
        .insert(tenant.db())
        .await?;
        Ok(())
    }
}
