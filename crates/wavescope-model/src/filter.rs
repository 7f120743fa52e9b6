// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Discriminator family named by a filter expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum FilterKind {
    Cps,
    Cpm,
}

impl FilterKind {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "cps" => Some(Self::Cps),
            "cpm" => Some(Self::Cpm),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cps => "cps",
            Self::Cpm => "cpm",
        }
    }
}

/// Parsed numeric gates on the shape ratio (PSD) and on energy.
///
/// Bounds are inclusive. A `between` clause always yields `lo <= hi`; bounds
/// built from two one-sided clauses are kept exactly as written, even when
/// they describe an empty interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: Option<FilterKind>,
    #[serde(rename = "psd_lo")]
    pub shape_lo: Option<f64>,
    #[serde(rename = "psd_hi")]
    pub shape_hi: Option<f64>,
    pub e_lo: Option<f64>,
    pub e_hi: Option<f64>,
    pub raw: String,
}

impl FilterSpec {
    /// No gates, `kind = None`, carrying the raw text for echoing.
    #[must_use]
    pub fn unfiltered(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_shape_bounds(&self) -> bool {
        self.shape_lo.is_some() || self.shape_hi.is_some()
    }

    #[must_use]
    pub fn has_energy_bounds(&self) -> bool {
        self.e_lo.is_some() || self.e_hi.is_some()
    }

    /// Shape gate. A non-finite ratio never passes.
    #[must_use]
    pub fn accepts_shape(&self, ratio: f64) -> bool {
        ratio.is_finite() && within(ratio, self.shape_lo, self.shape_hi)
    }

    #[must_use]
    pub fn accepts_energy(&self, energy: f64) -> bool {
        within(energy, self.e_lo, self.e_hi)
    }
}

fn within(value: f64, lo: Option<f64>, hi: Option<f64>) -> bool {
    lo.map_or(true, |lo| value >= lo) && hi.map_or(true, |hi| value <= hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_follow_psd_convention() {
        let spec = FilterSpec {
            kind: Some(FilterKind::Cps),
            shape_lo: Some(0.18),
            shape_hi: None,
            e_lo: Some(601.0),
            e_hi: Some(900.0),
            raw: "cps(>0.18, between 601 and 900)".to_string(),
        };
        let v = serde_json::to_value(&spec).expect("json");
        assert_eq!(v["kind"], "cps");
        assert_eq!(v["psd_lo"], 0.18);
        assert!(v["psd_hi"].is_null());
        assert_eq!(v["e_lo"], 601.0);
        assert_eq!(v["e_hi"], 900.0);
        assert_eq!(v["raw"], "cps(>0.18, between 601 and 900)");
    }

    #[test]
    fn unfiltered_kind_is_null() {
        let v = serde_json::to_value(FilterSpec::unfiltered("banana")).expect("json");
        assert!(v["kind"].is_null());
        assert_eq!(v["raw"], "banana");
    }

    #[test]
    fn gates_are_inclusive_and_reject_nan() {
        let spec = FilterSpec {
            shape_lo: Some(0.2),
            shape_hi: Some(0.4),
            e_lo: Some(10.0),
            ..FilterSpec::default()
        };
        assert!(spec.accepts_shape(0.2));
        assert!(spec.accepts_shape(0.4));
        assert!(!spec.accepts_shape(0.41));
        assert!(!spec.accepts_shape(f64::NAN));
        assert!(!spec.accepts_shape(f64::INFINITY));
        assert!(spec.accepts_energy(10.0));
        assert!(!spec.accepts_energy(9.99));
    }

    #[test]
    fn reversed_one_sided_bounds_accept_nothing() {
        let spec = FilterSpec {
            shape_lo: Some(10.0),
            shape_hi: Some(5.0),
            ..FilterSpec::default()
        };
        for v in [0.0, 5.0, 7.5, 10.0, 12.0] {
            assert!(!spec.accepts_shape(v));
        }
    }
}
