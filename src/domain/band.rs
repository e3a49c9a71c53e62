//! Risk band classification.
//!
//! Ten half-open bands of width 0.1 over [0,1); risk 1.0 belongs to the last
//! band. Each band carries a market zone and a recommendation signal.

use crate::domain::error::RiskError;
use std::fmt;
use std::str::FromStr;

pub const BAND_COUNT: usize = 10;
pub const BAND_WIDTH: f64 = 0.1;

const SIGNALS: [&str; BAND_COUNT] = [
    "STRONG BUY",
    "BUY",
    "ACCUMULATE",
    "LIGHT ACCUMULATE",
    "HOLD",
    "NEUTRAL",
    "TAKE PROFIT",
    "SELL",
    "STRONG SELL",
    "EXTREME SELL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Accumulation,
    Transition,
    Distribution,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Accumulation => "ACCUMULATION",
            Zone::Transition => "TRANSITION",
            Zone::Distribution => "DISTRIBUTION",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the ten fixed risk bands, identified by its index (0 = [0.0, 0.1)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RiskBand(u8);

impl RiskBand {
    pub fn from_index(index: usize) -> Option<Self> {
        if index < BAND_COUNT {
            Some(RiskBand(index as u8))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = RiskBand> {
        (0..BAND_COUNT as u8).map(RiskBand)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn lower(&self) -> f64 {
        self.0 as f64 * BAND_WIDTH
    }

    pub fn upper(&self) -> f64 {
        (self.0 as f64 + 1.0) * BAND_WIDTH
    }

    pub fn center(&self) -> f64 {
        (self.0 as f64 + 0.5) * BAND_WIDTH
    }

    /// Zone by band: bands 0-2 accumulate, 3-6 transition, 7-9 distribute.
    pub fn zone(&self) -> Zone {
        match self.0 {
            0..=2 => Zone::Accumulation,
            3..=6 => Zone::Transition,
            _ => Zone::Distribution,
        }
    }

    pub fn signal(&self) -> &'static str {
        SIGNALS[self.index()]
    }

    /// Storage label, e.g. `band_30_40`.
    pub fn label(&self) -> String {
        format!("band_{}_{}", self.0 as u32 * 10, (self.0 as u32 + 1) * 10)
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}-{:.1}", self.lower(), self.upper())
    }
}

impl FromStr for RiskBand {
    type Err = String;

    /// Accepts `band_30_40` or `0.3-0.4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (lo, hi) = if let Some(rest) = s.strip_prefix("band_") {
            let (lo, hi) = rest
                .split_once('_')
                .ok_or_else(|| format!("malformed band label: {s}"))?;
            let lo: u32 = lo.parse().map_err(|_| format!("malformed band label: {s}"))?;
            let hi: u32 = hi.parse().map_err(|_| format!("malformed band label: {s}"))?;
            (lo, hi)
        } else {
            let (lo, hi) = s
                .split_once('-')
                .ok_or_else(|| format!("malformed band label: {s}"))?;
            let lo: f64 = lo.parse().map_err(|_| format!("malformed band label: {s}"))?;
            let hi: f64 = hi.parse().map_err(|_| format!("malformed band label: {s}"))?;
            ((lo * 100.0).round() as u32, (hi * 100.0).round() as u32)
        };

        if lo > 90 || lo % 10 != 0 || hi != lo + 10 {
            return Err(format!("not a 0.1-wide band: {s}"));
        }
        Ok(RiskBand((lo / 10) as u8))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub band: RiskBand,
    pub zone: Zone,
    pub signal: &'static str,
}

impl Classification {
    pub fn band_label(&self) -> String {
        self.band.label()
    }
}

/// Band lookup for a risk value. Values outside [0,1] are a caller bug and
/// are rejected rather than clamped.
pub fn band_of(risk: f64) -> Result<RiskBand, RiskError> {
    if !(0.0..=1.0).contains(&risk) {
        return Err(RiskError::out_of_range("risk", risk));
    }
    let index = ((risk * BAND_COUNT as f64).floor() as usize).min(BAND_COUNT - 1);
    Ok(RiskBand(index as u8))
}

pub fn classify(risk: f64) -> Result<Classification, RiskError> {
    let band = band_of(risk)?;
    Ok(Classification {
        band,
        zone: band.zone(),
        signal: band.signal(),
    })
}
