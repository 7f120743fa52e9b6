// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::{Display, Formatter};
use wavescope_core::PathError;
use wavescope_model::QueryDebug;
use wavescope_query::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidParam,
    MissingParam,
    InvalidTimestamp,
    InvalidWindow,
    PathRejected,
    IndexQuery,
    TooManyFiles,
    PayloadTooLarge,
    Unavailable,
    Internal,
}

impl ApiErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParam => "invalid_param",
            Self::MissingParam => "missing_param",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::InvalidWindow => "invalid_window",
            Self::PathRejected => "path_rejected",
            Self::IndexQuery => "index_query",
            Self::TooManyFiles => "too_many_files",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

/// A request failure. `details` holds extra top-level body fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidParam,
            format!("Invalid {name}: {value}"),
            Value::Null,
        )
    }

    #[must_use]
    pub fn bad_table(table: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidParam,
            format!("Bad table name: {table}"),
            Value::Null,
        )
    }

    #[must_use]
    pub fn missing_window() -> Self {
        Self::new(
            ApiErrorCode::MissingParam,
            "Provide start and end query params.",
            Value::Null,
        )
    }

    #[must_use]
    pub fn invalid_timestamp(raw: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidTimestamp,
            format!("Invalid timestamp: {raw}. Use ISO8601, e.g. 2025-09-08T12:00:00"),
            Value::Null,
        )
    }

    #[must_use]
    pub fn invalid_window(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidWindow, message, Value::Null)
    }

    #[must_use]
    pub fn too_many_files(found: usize, max: usize) -> Self {
        Self::new(
            ApiErrorCode::TooManyFiles,
            format!(
                "Too many ROOT files match the selected window ({found} > {max}). Please select a narrower time span."
            ),
            Value::Null,
        )
    }

    /// File-count rejection for listings, which always carry the query
    /// diagnostics.
    #[must_use]
    pub fn too_many_files_with_debug(found: usize, max: usize, debug: &QueryDebug) -> Self {
        let mut err = Self::too_many_files(found, max);
        err.details = json!({ "debug": debug });
        err
    }

    #[must_use]
    pub fn too_many_pulses(returned: usize, total_matching: usize, max: usize) -> Self {
        Self::new(
            ApiErrorCode::PayloadTooLarge,
            format!(
                "Too many matching pulses for a single JSON payload ({returned} > {max}). Please narrow the time window or re-run with &force=1 (careful: very large JSON)."
            ),
            json!({ "returned_pulses": returned, "total_matching": total_matching }),
        )
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unavailable, message, Value::Null)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message, Value::Null)
    }

    /// JSON body: `{"error": message}` plus any detail fields.
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(self.message.clone()));
        if let Value::Object(details) = &self.details {
            for (k, v) in details {
                body.insert(k.clone(), v.clone());
            }
        }
        Value::Object(body)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<PathError> for ApiError {
    fn from(e: PathError) -> Self {
        Self::new(ApiErrorCode::PathRejected, e.message, Value::Null)
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self::new(ApiErrorCode::IndexQuery, e.message, Value::Null)
    }
}
