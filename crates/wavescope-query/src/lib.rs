// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod filters;
mod index;
mod pool;
mod query_error;
mod sql_text;

pub use filters::{parse_filter_expr, FilterParser};
pub use index::{
    build_candidate_sql, channel_pattern, find_candidates, register_index_functions,
    validate_table_name, CandidateQuery, CandidateResult, FNAME_INTERVAL_PATTERN,
};
pub use pool::{IndexPool, IndexPoolConfig};
pub use query_error::{QueryError, QueryErrorCode};
pub use sql_text::{expand_sql, quote_literal, SqlParam};

pub const CRATE_NAME: &str = "wavescope-query";
