use actix_web::{HttpRequest, HttpResponse, Result, ResponseError, web};

use super::tenant_from_request;
use crate::database::TenantRegistry;
use crate::models::*;
use crate::services::FreezeService;

#[utoipa::path(
    post,
    path = "/subscriptions/{id}/freeze",
    tag = "subscription",
    params(
        ("id" = i64, Path, description = "订阅ID"),
        ("X-Tenant-ID" = Option<String>, Header, description = "租户标识")
    ),
    request_body = FreezeRequest,
    responses(
        (status = 200, description = "冻结成功", body = FreezeApiResponse),
        (status = 404, description = "订阅不存在"),
        (status = 422, description = "冻结区间超出订阅有效期")
    )
)]
pub async fn freeze_subscription(
    registry: web::Data<TenantRegistry>,
    freeze_service: web::Data<FreezeService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<FreezeRequest>,
) -> Result<HttpResponse> {
    let tenant = tenant_from_request(&registry, &req)?;

    match freeze_service
        .freeze(&tenant, path.into_inner(), request.into_inner().into())
        .await
    {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiResponse::success(FreezeResponse::from(
            outcome,
        )))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions").route("/{id}/freeze", web::post().to(freeze_subscription)),
    );
}
