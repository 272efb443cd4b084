use actix_web::{HttpRequest, HttpResponse, Result, ResponseError, web};

use super::{actor_from_request, tenant_from_request};
use crate::database::TenantRegistry;
use crate::models::*;
use crate::services::{AttendanceService, MarkAttendance};

#[utoipa::path(
    post,
    path = "/lessons/{lesson_id}/attendance",
    tag = "attendance",
    params(
        ("lesson_id" = i64, Path, description = "课程ID"),
        ("X-Tenant-ID" = Option<String>, Header, description = "租户标识"),
        ("X-Actor-ID" = Option<i64>, Header, description = "点名操作人")
    ),
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "点名成功", body = AttendanceApiResponse),
        (status = 404, description = "课程或学生不存在"),
        (status = 409, description = "重复写入冲突"),
        (status = 422, description = "课程未开始或订阅并发冲突，请重试")
    )
)]
pub async fn mark_attendance(
    registry: web::Data<TenantRegistry>,
    attendance_service: web::Data<AttendanceService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<MarkAttendanceRequest>,
) -> Result<HttpResponse> {
    let tenant = tenant_from_request(&registry, &req)?;
    let actor_id = actor_from_request(&req)?;
    let request = request.into_inner();

    let command = MarkAttendance {
        lesson_id: path.into_inner(),
        student_id: request.student_id,
        status: request.status,
        reason: request.reason,
        notes: request.notes,
        actor_id,
    };

    match attendance_service.mark_attendance(&tenant, command).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AttendanceResponse::from(outcome),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn attendance_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lessons").route("/{lesson_id}/attendance", web::post().to(mark_attendance)),
    );
}
