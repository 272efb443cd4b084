use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{AttendanceStatus, SubscriptionStatus};
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::attendance::mark_attendance,
        handlers::subscription::freeze_subscription,
        handlers::schedule::generate_occurrences,
        handlers::schedule::regenerate_future,
        handlers::admin::generate_all,
        handlers::admin::cleanup_past,
    ),
    components(
        schemas(
            AttendanceStatus,
            SubscriptionStatus,
            MarkAttendanceRequest,
            AttendanceResponse,
            FreezeRequest,
            FreezeResponse,
            SubscriptionResponse,
            RegenerateRequest,
            GenerateOccurrencesResponse,
            RegenerateResponse,
            GenerateAllResponse,
            CleanupResponse,
            ApiError,
            AttendanceApiResponse,
            FreezeApiResponse,
            GenerateOccurrencesApiResponse,
            RegenerateApiResponse,
            GenerateAllApiResponse,
            CleanupApiResponse,
        )
    ),
    tags(
        (name = "attendance", description = "Attendance and lesson deduction API"),
        (name = "subscription", description = "Subscription freeze API"),
        (name = "schedule", description = "Schedule rule expansion API"),
        (name = "admin", description = "Schedule maintenance API"),
    ),
    info(
        title = "Academy Backend API",
        version = "1.0.0",
        description = "Attendance, freeze and scheduling REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
