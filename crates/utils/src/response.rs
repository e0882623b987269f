use serde::Serialize;
use ts_rs::TS;

/// Uniform JSON envelope for every API response, success or failure.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            detail: None,
            errors: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            detail: Some(detail.into()),
            errors: None,
        }
    }

    pub fn validation_error(detail: impl Into<String>, errors: Vec<FieldError>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            detail: Some(detail.into()),
            errors: Some(errors),
        }
    }
}
