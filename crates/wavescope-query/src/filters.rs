// SPDX-License-Identifier: Apache-2.0

//! Parser for compact discrimination filters such as
//! `cps(>0.18, between 601 and 900)`.
//!
//! The left clause gates the shape ratio, the right clause gates energy.
//! Anything that does not fit the grammar degrades to "no filter".

use regex::Regex;
use std::sync::OnceLock;
use wavescope_model::{FilterKind, FilterSpec};

const NUM: &str = r"[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?";

pub struct FilterParser {
    outer: Regex,
    between: Regex,
    inequality: Regex,
}

impl FilterParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            outer: Regex::new(r"(?i)^(cps|cpm)\s*\((.*)\)\s*$")?,
            between: Regex::new(&format!(r"(?i)between\s*({NUM})\s*and\s*({NUM})"))?,
            inequality: Regex::new(&format!(r"(>=|<=|>|<|=)\s*({NUM})"))?,
        })
    }

    #[must_use]
    pub fn parse(&self, raw: &str) -> FilterSpec {
        let mut spec = FilterSpec::unfiltered(raw);
        let text = raw.trim();
        if text.is_empty() {
            return spec;
        }
        let Some(caps) = self.outer.captures(text) else {
            return spec;
        };
        spec.kind = caps.get(1).and_then(|m| FilterKind::parse(m.as_str()));
        let inner = caps.get(2).map_or("", |m| m.as_str());

        let (shape_clause, energy_clause) = match inner.split_once(',') {
            Some((left, right)) => (left.trim(), right.trim()),
            None => (inner.trim(), ""),
        };

        if let Some((lo, hi)) = self.clause_bounds(shape_clause) {
            if lo.is_some() {
                spec.shape_lo = lo;
            }
            if hi.is_some() {
                spec.shape_hi = hi;
            }
        }
        if let Some((lo, hi)) = self.clause_bounds(energy_clause) {
            if lo.is_some() {
                spec.e_lo = lo;
            }
            if hi.is_some() {
                spec.e_hi = hi;
            }
        }
        spec
    }

    /// `between` wins over a bare inequality when both appear.
    fn clause_bounds(&self, clause: &str) -> Option<(Option<f64>, Option<f64>)> {
        if clause.is_empty() {
            return None;
        }
        if let Some((a, b)) = self.between_bounds(clause) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            return Some((Some(lo), Some(hi)));
        }
        let caps = self.inequality.captures(clause)?;
        let value: f64 = caps.get(2)?.as_str().parse().ok()?;
        match caps.get(1)?.as_str() {
            ">" | ">=" => Some((Some(value), None)),
            "<" | "<=" => Some((None, Some(value))),
            "=" => Some((Some(value), Some(value))),
            _ => None,
        }
    }

    fn between_bounds(&self, clause: &str) -> Option<(f64, f64)> {
        let caps = self.between.captures(clause)?;
        let a: f64 = caps.get(1)?.as_str().parse().ok()?;
        let b: f64 = caps.get(2)?.as_str().parse().ok()?;
        Some((a, b))
    }
}

/// Parse with a process-wide compiled parser.
#[must_use]
pub fn parse_filter_expr(raw: &str) -> FilterSpec {
    static PARSER: OnceLock<Option<FilterParser>> = OnceLock::new();
    match PARSER.get_or_init(|| FilterParser::new().ok()) {
        Some(parser) => parser.parse(raw),
        None => FilterSpec::unfiltered(raw),
    }
}
