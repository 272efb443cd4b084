use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    AttendanceResponse, CleanupResponse, FreezeResponse, GenerateAllResponse,
    GenerateOccurrencesResponse, RegenerateResponse,
};

/// 统一响应外壳 `{"success": true, "data": ...}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(
    AttendanceApiResponse = ApiResponse<AttendanceResponse>,
    FreezeApiResponse = ApiResponse<FreezeResponse>,
    GenerateOccurrencesApiResponse = ApiResponse<GenerateOccurrencesResponse>,
    RegenerateApiResponse = ApiResponse<RegenerateResponse>,
    GenerateAllApiResponse = ApiResponse<GenerateAllResponse>,
    CleanupApiResponse = ApiResponse<CleanupResponse>
)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
            error: None,
        }
    }
}
