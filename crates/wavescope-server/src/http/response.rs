// SPDX-License-Identifier: Apache-2.0

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, info};
use wavescope_api::{map_error, map_error_plain, ApiError, ApiErrorCode};

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn log_rejection(err: &ApiError, status: StatusCode) {
    if err.code == ApiErrorCode::Internal {
        error!(code = err.code.as_str(), status = status.as_u16(), error = %err, "request failed");
    } else {
        info!(code = err.code.as_str(), status = status.as_u16(), error = %err, "request rejected");
    }
}

#[must_use]
pub(crate) fn json_response<T: Serialize>(body: &T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

#[must_use]
pub(crate) fn api_error_response(err: &ApiError) -> Response {
    let status = status_of(map_error(err).status_code);
    log_rejection(err, status);
    (status, Json(err.body())).into_response()
}

/// Error body for routes whose success payload is not JSON.
#[must_use]
pub(crate) fn plain_error_response(err: &ApiError) -> Response {
    let status = status_of(map_error_plain(err).status_code);
    log_rejection(err, status);
    let mut resp = (status, err.message.clone()).into_response();
    resp.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    resp
}

#[must_use]
pub(crate) fn png_response(bytes: Vec<u8>) -> Response {
    let mut resp = (StatusCode::OK, bytes).into_response();
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
    resp
}
