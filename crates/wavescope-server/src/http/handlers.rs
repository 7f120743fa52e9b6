// SPDX-License-Identifier: Apache-2.0

use axum::extract::{Query, State};
use axum::response::Response;
use tracing::Span;
use wavescope_api::{
    first_value_per_key, parse_waveform_params, ApiError, CappedResponse, HealthResponse,
    MetaResponse, RequestEcho, UncappedResponse, WaveformParams,
};
use wavescope_model::{PulseRecord, Waveform};

use crate::aggregate::{aggregate_capped, aggregate_uncapped, list_files, lookup_candidates};
use crate::http::response::{api_error_response, json_response, plain_error_response, png_response};
use crate::render::{plot_title, render_waveforms};
use crate::AppState;

type QueryPairs = Query<Vec<(String, String)>>;

fn parse_params(
    state: &AppState,
    pairs: Vec<(String, String)>,
) -> Result<WaveformParams, ApiError> {
    parse_waveform_params(&first_value_per_key(pairs), &state.cfg)
}

/// Run `job` on the blocking pool under a heavy-worker permit.
async fn run_heavy<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
{
    let permit = tokio::time::timeout(
        state.server.request_timeout,
        state.heavy_workers.clone().acquire_owned(),
    )
    .await
    .map_err(|_| ApiError::unavailable("server busy, retry later"))?
    .map_err(|_| ApiError::unavailable("server is shutting down"))?;

    let job_state = state.clone();
    let span = Span::current();
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let _entered = span.enter();
        job(&job_state)
    })
    .await
    .map_err(|e| ApiError::internal(format!("worker failed: {e}")))?
}

pub(crate) async fn waveforms_png_handler(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Response {
    let params = match parse_params(&state, pairs) {
        Ok(params) => params,
        Err(err) => return plain_error_response(&err),
    };
    let rendered = run_heavy(&state, move |st| {
        let candidates = lookup_candidates(&st.pool, &st.cfg, &params)?;
        let outcome = aggregate_capped(st.source.as_ref(), &st.cfg, &params, &candidates)?;
        let traces: Vec<Waveform> = outcome
            .records
            .into_iter()
            .map(PulseRecord::into_waveform)
            .collect();
        render_waveforms(&traces, &plot_title(&params.window), params.yoffset)
            .map_err(|e| ApiError::internal(e.to_string()))
    })
    .await;
    match rendered {
        Ok(bytes) => png_response(bytes),
        Err(err) => plain_error_response(&err),
    }
}

pub(crate) async fn waveforms_json_handler(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Response {
    let params = match parse_params(&state, pairs) {
        Ok(params) => params,
        Err(err) => return api_error_response(&err),
    };
    let built = run_heavy(&state, move |st| {
        let candidates = lookup_candidates(&st.pool, &st.cfg, &params)?;
        let outcome = aggregate_capped(st.source.as_ref(), &st.cfg, &params, &candidates)?;
        let debug = params
            .debug
            .then(|| candidates.debug(Some(outcome.per_file)));
        let pulses = outcome.records.iter().map(PulseRecord::summary).collect();
        let data = outcome
            .records
            .into_iter()
            .map(PulseRecord::into_waveform)
            .collect::<Vec<_>>();
        Ok(CappedResponse {
            echo: RequestEcho::from(&params),
            count: data.len(),
            total_matching: outcome.total_matching,
            max_n: params.max_n,
            granularity: params.granularity,
            yoffset: params.yoffset,
            files: outcome.files,
            data,
            pulses,
            debug,
        })
    })
    .await;
    match built {
        Ok(body) => json_response(&body),
        Err(err) => api_error_response(&err),
    }
}

pub(crate) async fn waveforms_all_json_handler(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Response {
    let params = match parse_params(&state, pairs) {
        Ok(params) => params,
        Err(err) => return api_error_response(&err),
    };
    let built = run_heavy(&state, move |st| {
        let candidates = lookup_candidates(&st.pool, &st.cfg, &params)?;
        let outcome = aggregate_uncapped(st.source.as_ref(), &st.cfg, &params, &candidates)?;
        let debug = params
            .debug
            .then(|| candidates.debug(Some(outcome.per_file)));
        Ok(UncappedResponse {
            echo: RequestEcho::from(&params),
            granularity: params.granularity,
            returned_pulses: outcome.records.len(),
            total_matching: outcome.total_matching,
            files: outcome.files,
            pulses: outcome.records,
            debug,
        })
    })
    .await;
    match built {
        Ok(body) => json_response(&body),
        Err(err) => api_error_response(&err),
    }
}

pub(crate) async fn waveforms_meta_handler(
    State(state): State<AppState>,
    Query(pairs): QueryPairs,
) -> Response {
    let params = match parse_params(&state, pairs) {
        Ok(params) => params,
        Err(err) => return api_error_response(&err),
    };
    let built = run_heavy(&state, move |st| {
        let candidates = lookup_candidates(&st.pool, &st.cfg, &params)?;
        let files = list_files(st.source.as_ref(), &st.cfg, &params, &candidates)?;
        Ok(MetaResponse {
            echo: RequestEcho::from(&params),
            files,
            debug: params.debug.then(|| candidates.debug(None)),
        })
    })
    .await;
    match built {
        Ok(body) => json_response(&body),
        Err(err) => api_error_response(&err),
    }
}

pub(crate) async fn healthz_handler() -> Response {
    json_response(&HealthResponse::ok())
}
