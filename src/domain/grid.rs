//! Precomputed risk grid.
//!
//! `steps` equally spaced risk values over [0,1] with their prices, used for
//! batch and dashboard lookups. Interpolation between points is linear in
//! log-price, which matches the transform exactly.

use crate::domain::bounds::AssetBounds;
use crate::domain::error::RiskError;
use crate::domain::transform::price_of;

pub const DEFAULT_GRID_STEPS: usize = 41;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskGridPoint {
    pub asset_id: String,
    pub risk: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskGrid {
    pub asset_id: String,
    pub points: Vec<RiskGridPoint>,
}

pub fn generate_grid(bounds: &AssetBounds, steps: usize) -> Result<RiskGrid, RiskError> {
    if steps < 2 {
        return Err(RiskError::out_of_range("grid steps", steps as f64));
    }

    let last = steps - 1;
    let points = (0..steps)
        .map(|i| {
            // End points are pinned so the grid reproduces the bounds exactly.
            let (risk, price) = if i == 0 {
                (0.0, bounds.min_price)
            } else if i == last {
                (1.0, bounds.max_price)
            } else {
                let risk = i as f64 / last as f64;
                (risk, price_of(risk, bounds))
            };
            RiskGridPoint {
                asset_id: bounds.asset_id.clone(),
                risk,
                price,
            }
        })
        .collect();

    Ok(RiskGrid {
        asset_id: bounds.asset_id.clone(),
        points,
    })
}

impl RiskGrid {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn step(&self) -> f64 {
        1.0 / (self.points.len().saturating_sub(1)).max(1) as f64
    }

    pub fn first(&self) -> Option<&RiskGridPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&RiskGridPoint> {
        self.points.last()
    }

    /// Grid point whose risk is closest to `risk` (clamped to [0,1]).
    pub fn nearest(&self, risk: f64) -> Option<&RiskGridPoint> {
        if self.points.is_empty() || risk.is_nan() {
            return None;
        }
        let r = risk.clamp(0.0, 1.0);
        let idx = (r / self.step()).round() as usize;
        self.points.get(idx.min(self.points.len() - 1))
    }

    /// Price at `risk` by log-linear interpolation between neighbours.
    pub fn price_at(&self, risk: f64) -> Option<f64> {
        if self.points.len() < 2 || risk.is_nan() {
            return None;
        }
        let r = risk.clamp(0.0, 1.0);
        let last = self.points.len() - 1;
        let pos = r / self.step();
        let lo = (pos.floor() as usize).min(last - 1);
        let a = &self.points[lo];
        let b = &self.points[lo + 1];
        let t = (r - a.risk) / (b.risk - a.risk);
        Some((a.price.ln() + t * (b.price.ln() - a.price.ln())).exp())
    }

    /// Risk at `price` by inverse log-linear interpolation; prices outside the
    /// grid clamp to 0 or 1.
    pub fn risk_at(&self, price: f64) -> Option<f64> {
        let (first, last) = (self.points.first()?, self.points.last()?);
        if price.is_nan() {
            return None;
        }
        if price <= first.price {
            return Some(0.0);
        }
        if price >= last.price {
            return Some(1.0);
        }
        // First point with price >= target; prices are non-decreasing.
        let hi = self.points.partition_point(|p| p.price < price);
        let a = &self.points[hi - 1];
        let b = &self.points[hi];
        let span = b.price.ln() - a.price.ln();
        if span <= 0.0 {
            return Some(a.risk);
        }
        let t = (price.ln() - a.price.ln()) / span;
        Some(a.risk + t * (b.risk - a.risk))
    }

    /// Bounds this grid was generated from must match `bounds` at both ends.
    pub fn matches(&self, bounds: &AssetBounds) -> bool {
        match (self.first(), self.last()) {
            (Some(f), Some(l)) => {
                self.asset_id == bounds.asset_id
                    && f.price == bounds.min_price
                    && l.price == bounds.max_price
            }
            _ => false,
        }
    }
}
