// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use serde::Serialize;

/// One matching event with its absolute time and optional energies.
///
/// `samples` is already stride-reduced. It is empty when the extractor ran
/// without sample materialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseRecord {
    #[serde(with = "crate::iso_time")]
    pub time: NaiveDateTime,
    pub samples: Vec<i64>,
    pub energy: Option<f64>,
    pub energy_short: Option<f64>,
    pub psd: Option<f64>,
}

impl PulseRecord {
    /// Shape ratio `1 - short/energy`; `None` for a zero or non-finite result.
    #[must_use]
    pub fn shape_ratio(energy: f64, energy_short: f64) -> Option<f64> {
        if energy == 0.0 {
            return None;
        }
        let ratio = 1.0 - energy_short / energy;
        ratio.is_finite().then_some(ratio)
    }

    #[must_use]
    pub fn summary(&self) -> PulseSummary {
        PulseSummary {
            time: self.time,
            energy: self.energy,
            energy_short: self.energy_short,
            psd: self.psd,
        }
    }

    #[must_use]
    pub fn into_waveform(self) -> Waveform {
        Waveform {
            time: self.time,
            samples: self.samples,
        }
    }
}

/// Pulse metadata listed next to a plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseSummary {
    #[serde(with = "crate::iso_time")]
    pub time: NaiveDateTime,
    pub energy: Option<f64>,
    pub energy_short: Option<f64>,
    pub psd: Option<f64>,
}

/// Plot series entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waveform {
    #[serde(with = "crate::iso_time")]
    pub time: NaiveDateTime,
    pub samples: Vec<i64>,
}
