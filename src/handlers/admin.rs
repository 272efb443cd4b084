use actix_web::{HttpRequest, HttpResponse, Result, ResponseError, web};

use super::tenant_from_request;
use crate::config::SchedulerConfig;
use crate::database::TenantRegistry;
use crate::models::*;
use crate::services::ScheduleService;

#[utoipa::path(
    post,
    path = "/admin/schedule/generate-all",
    tag = "admin",
    params(
        ("X-Tenant-ID" = Option<String>, Header, description = "租户标识"),
        GenerateQuery
    ),
    responses(
        (status = 200, description = "批量生成完成", body = GenerateAllApiResponse),
        (status = 500, description = "生成失败")
    )
)]
pub async fn generate_all(
    registry: web::Data<TenantRegistry>,
    schedule_service: web::Data<ScheduleService>,
    req: HttpRequest,
    query: web::Query<GenerateQuery>,
) -> Result<HttpResponse> {
    let tenant = tenant_from_request(&registry, &req)?;

    match schedule_service
        .generate_for_all_active_rules(&tenant, query.days_ahead)
        .await
    {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            GenerateAllResponse::from(summary),
            "排课生成完成".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/schedule/cleanup",
    tag = "admin",
    params(
        ("X-Tenant-ID" = Option<String>, Header, description = "租户标识"),
        CleanupQuery
    ),
    responses(
        (status = 200, description = "清理完成", body = CleanupApiResponse),
        (status = 500, description = "清理失败")
    )
)]
pub async fn cleanup_past(
    registry: web::Data<TenantRegistry>,
    schedule_service: web::Data<ScheduleService>,
    scheduler: web::Data<SchedulerConfig>,
    req: HttpRequest,
    query: web::Query<CleanupQuery>,
) -> Result<HttpResponse> {
    let tenant = tenant_from_request(&registry, &req)?;
    let older_than_days = query
        .older_than_days
        .unwrap_or(scheduler.cleanup_older_than_days);

    match schedule_service.cleanup_past(&tenant, older_than_days).await {
        Ok(deleted) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            CleanupResponse {
                deleted,
                older_than_days,
            },
            "过期课次清理完成".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/schedule")
            .route("/generate-all", web::post().to(generate_all))
            .route("/cleanup", web::post().to(cleanup_past)),
    );
}
