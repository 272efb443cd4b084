use actix_web::{HttpRequest, HttpResponse, Result, ResponseError, web};

use super::tenant_from_request;
use crate::database::TenantRegistry;
use crate::models::*;
use crate::services::ScheduleService;

#[utoipa::path(
    post,
    path = "/schedule-rules/{id}/generate",
    tag = "schedule",
    params(
        ("id" = i64, Path, description = "排课规则ID"),
        ("X-Tenant-ID" = Option<String>, Header, description = "租户标识"),
        GenerateQuery
    ),
    responses(
        (status = 200, description = "生成成功", body = GenerateOccurrencesApiResponse),
        (status = 404, description = "规则不存在")
    )
)]
pub async fn generate_occurrences(
    registry: web::Data<TenantRegistry>,
    schedule_service: web::Data<ScheduleService>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<GenerateQuery>,
) -> Result<HttpResponse> {
    let tenant = tenant_from_request(&registry, &req)?;
    let rule = schedule_service.find_rule(&tenant, path.into_inner()).await?;

    match schedule_service
        .generate_occurrences(&tenant, &rule, query.days_ahead)
        .await
    {
        Ok(created) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            GenerateOccurrencesResponse {
                rule_id: rule.id,
                created,
            },
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/schedule-rules/{id}/regenerate",
    tag = "schedule",
    params(
        ("id" = i64, Path, description = "排课规则ID"),
        ("X-Tenant-ID" = Option<String>, Header, description = "租户标识")
    ),
    request_body = RegenerateRequest,
    responses(
        (status = 200, description = "重新生成成功", body = RegenerateApiResponse),
        (status = 404, description = "规则不存在")
    )
)]
pub async fn regenerate_future(
    registry: web::Data<TenantRegistry>,
    schedule_service: web::Data<ScheduleService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: Option<web::Json<RegenerateRequest>>,
) -> Result<HttpResponse> {
    let tenant = tenant_from_request(&registry, &req)?;
    let rule_id = path.into_inner();
    let request = request.map(|r| r.into_inner()).unwrap_or_default();
    let from_time = request.from_time.unwrap_or_else(|| tenant.now());

    match schedule_service
        .regenerate_future(&tenant, rule_id, from_time, request.days_ahead)
        .await
    {
        Ok(summary) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            RegenerateResponse::new(rule_id, from_time, summary),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn schedule_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/schedule-rules")
            .route("/{id}/generate", web::post().to(generate_occurrences))
            .route("/{id}/regenerate", web::post().to(regenerate_future)),
    );
}
