// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! Request parsing, error shapes and response bodies of the waveform routes.

mod dto;
mod error_mapping;
mod errors;
mod params;

pub use dto::{CappedResponse, HealthResponse, MetaResponse, RequestEcho, UncappedResponse};
pub use error_mapping::{map_error, map_error_plain, ApiErrorMapping};
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    channel_from_device, first_value_per_key, parse_waveform_params, WaveformParams,
};

pub const CRATE_NAME: &str = "wavescope-api";

pub const ROUTE_PNG: &str = "/waveforms.png";
pub const ROUTE_JSON: &str = "/waveforms.json";
pub const ROUTE_ALL_JSON: &str = "/waveforms.all.json";
pub const ROUTE_META: &str = "/waveforms.meta";
pub const ROUTE_HEALTH: &str = "/healthz";
