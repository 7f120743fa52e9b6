// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
    /// Plain-text bodies are used by the image route.
    pub content_type_json: bool,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::Unavailable => 503,
        ApiErrorCode::Internal => 500,
        _ => 400,
    };
    ApiErrorMapping {
        status_code,
        content_type_json: true,
    }
}

/// Mapping for routes whose success body is not JSON.
#[must_use]
pub fn map_error_plain(error: &ApiError) -> ApiErrorMapping {
    ApiErrorMapping {
        content_type_json: false,
        ..map_error(error)
    }
}
