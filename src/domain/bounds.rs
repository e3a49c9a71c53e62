//! Per-asset price bounds.
//!
//! `min_price` maps to risk 0 and `max_price` to risk 1. Bounds are either
//! fixed historical extremes or derived from the reference asset by ratio.

use crate::domain::error::RiskError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundsSource {
    Fixed,
    Derived,
}

impl BoundsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundsSource::Fixed => "fixed",
            BoundsSource::Derived => "derived",
        }
    }
}

impl fmt::Display for BoundsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundsSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(BoundsSource::Fixed),
            "derived" => Ok(BoundsSource::Derived),
            other => Err(format!("unknown bounds source: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetBounds {
    pub asset_id: String,
    pub min_price: f64,
    pub max_price: f64,
    pub source: BoundsSource,
    pub updated_at: DateTime<Utc>,
}

impl AssetBounds {
    /// Validated constructor; enforces `max_price > min_price > 0`.
    pub fn new(
        asset_id: &str,
        min_price: f64,
        max_price: f64,
        source: BoundsSource,
    ) -> Result<Self, RiskError> {
        validate_pair(asset_id, min_price, max_price)?;
        Ok(Self {
            asset_id: normalize_asset(asset_id),
            min_price,
            max_price,
            source,
            updated_at: Utc::now(),
        })
    }

    /// Bounds scaled from a reference asset: `ref_min * ratio_bottom`,
    /// `ref_max * ratio_top`.
    pub fn derive_from(
        asset_id: &str,
        reference: &AssetBounds,
        ratio_bottom: f64,
        ratio_top: f64,
    ) -> Result<Self, RiskError> {
        for (name, ratio) in [("ratio_bottom", ratio_bottom), ("ratio_top", ratio_top)] {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(RiskError::InvalidBounds {
                    asset: normalize_asset(asset_id),
                    reason: format!("{name} must be positive, got {ratio}"),
                });
            }
        }
        Self::new(
            asset_id,
            reference.min_price * ratio_bottom,
            reference.max_price * ratio_top,
            BoundsSource::Derived,
        )
    }

    /// `ln(max/min)`, the width of the bounds in log-price space.
    pub fn log_span(&self) -> f64 {
        self.max_price.ln() - self.min_price.ln()
    }
}

/// Asset ids are case-insensitive; stored upper-case.
pub fn normalize_asset(asset_id: &str) -> String {
    asset_id.trim().to_uppercase()
}

fn validate_pair(asset_id: &str, min_price: f64, max_price: f64) -> Result<(), RiskError> {
    let reason = if !min_price.is_finite() || !max_price.is_finite() {
        Some("prices must be finite".to_string())
    } else if min_price <= 0.0 {
        Some(format!("min_price must be positive, got {min_price}"))
    } else if max_price <= min_price {
        Some(format!(
            "max_price ({max_price}) must exceed min_price ({min_price})"
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RiskError::InvalidBounds {
            asset: normalize_asset(asset_id),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_valid_pair() {
        let b = AssetBounds::new("btc", 30_000.0, 299_720.0, BoundsSource::Fixed).unwrap();
        assert_eq!(b.asset_id, "BTC");
        assert_eq!(b.source, BoundsSource::Fixed);
    }

    #[test]
    fn new_rejects_non_positive_min() {
        let err = AssetBounds::new("ETH", 0.0, 10.0, BoundsSource::Fixed).unwrap_err();
        assert!(matches!(err, RiskError::InvalidBounds { .. }));
    }

    #[test]
    fn new_rejects_inverted_pair() {
        assert!(AssetBounds::new("ETH", 10.0, 10.0, BoundsSource::Fixed).is_err());
        assert!(AssetBounds::new("ETH", 10.0, 5.0, BoundsSource::Fixed).is_err());
    }

    #[test]
    fn new_rejects_nan() {
        assert!(AssetBounds::new("ETH", f64::NAN, 10.0, BoundsSource::Fixed).is_err());
        assert!(AssetBounds::new("ETH", 1.0, f64::INFINITY, BoundsSource::Fixed).is_err());
    }

    #[test]
    fn derive_from_reference_scales_both_ends() {
        let btc = AssetBounds::new("BTC", 30_000.0, 300_000.0, BoundsSource::Fixed).unwrap();
        let eth = AssetBounds::derive_from("eth", &btc, 0.05, 0.04).unwrap();
        assert_eq!(eth.asset_id, "ETH");
        assert_eq!(eth.source, BoundsSource::Derived);
        assert!((eth.min_price - 1_500.0).abs() < 1e-9);
        assert!((eth.max_price - 12_000.0).abs() < 1e-9);
    }

    #[test]
    fn derive_from_rejects_bad_ratio() {
        let btc = AssetBounds::new("BTC", 30_000.0, 300_000.0, BoundsSource::Fixed).unwrap();
        assert!(AssetBounds::derive_from("ETH", &btc, -0.1, 0.04).is_err());
        // Ratios that collapse the pair are rejected by pair validation.
        assert!(AssetBounds::derive_from("ETH", &btc, 1.0, 0.1).is_err());
    }

    #[test]
    fn source_parse_and_display() {
        assert_eq!("Derived".parse::<BoundsSource>().unwrap(), BoundsSource::Derived);
        assert_eq!(BoundsSource::Fixed.to_string(), "fixed");
        assert!("guess".parse::<BoundsSource>().is_err());
    }
}
