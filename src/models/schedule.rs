use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::services::{BatchSummary, RegenerateSummary};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GenerateQuery {
    /// 生成天数（默认 90）
    pub days_ahead: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CleanupQuery {
    /// 清理多少天以前的课次（默认取配置）
    pub older_than_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct RegenerateRequest {
    /// Defaults to now.
    pub from_time: Option<DateTime<Utc>>,
    pub days_ahead: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateOccurrencesResponse {
    pub rule_id: i64,
    pub created: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegenerateResponse {
    pub rule_id: i64,
    pub from_time: DateTime<Utc>,
    pub deleted: u64,
    pub created: usize,
}

impl RegenerateResponse {
    pub fn new(rule_id: i64, from_time: DateTime<Utc>, summary: RegenerateSummary) -> Self {
        Self {
            rule_id,
            from_time,
            deleted: summary.deleted,
            created: summary.created,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateAllResponse {
    pub rules_expanded: usize,
    pub rules_skipped: usize,
    pub rules_failed: usize,
    pub occurrences_created: usize,
}

impl From<BatchSummary> for GenerateAllResponse {
    fn from(s: BatchSummary) -> Self {
        Self {
            rules_expanded: s.rules_expanded,
            rules_skipped: s.rules_skipped,
            rules_failed: s.rules_failed,
            occurrences_created: s.occurrences_created,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CleanupResponse {
    pub deleted: u64,
    pub older_than_days: i64,
}
