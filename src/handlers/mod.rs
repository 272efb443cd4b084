pub mod admin;
pub mod attendance;
pub mod schedule;
pub mod subscription;

pub use admin::admin_config;
pub use attendance::attendance_config;
pub use schedule::schedule_config;
pub use subscription::subscription_config;

use crate::database::{TenantContext, TenantRegistry};
use crate::error::{AppError, AppResult};
use actix_web::HttpRequest;

pub const TENANT_HEADER: &str = "X-Tenant-ID";
pub const ACTOR_HEADER: &str = "X-Actor-ID";

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// 根据 `X-Tenant-ID` 选择租户；只配置了一个租户时可省略
pub(crate) fn tenant_from_request(
    registry: &TenantRegistry,
    req: &HttpRequest,
) -> AppResult<TenantContext> {
    registry.resolve(header_value(req, TENANT_HEADER))
}

pub(crate) fn actor_from_request(req: &HttpRequest) -> AppResult<Option<i64>> {
    match header_value(req, ACTOR_HEADER) {
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
            AppError::ValidationError(format!("{ACTOR_HEADER} must be a numeric id, got {raw:?}"))
        }),
        None => Ok(None),
    }
}
