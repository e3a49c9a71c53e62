//! Logarithmic risk transform.
//!
//! risk = (ln p - ln min) / (ln max - ln min), clamped to [0,1] at the bounds.
//! Inverse: price = min * (max/min)^risk.

use crate::domain::bounds::AssetBounds;

pub fn risk_of(price: f64, bounds: &AssetBounds) -> f64 {
    if price <= bounds.min_price {
        return 0.0;
    }
    if price >= bounds.max_price {
        return 1.0;
    }
    (price.ln() - bounds.min_price.ln()) / bounds.log_span()
}

pub fn price_of(risk: f64, bounds: &AssetBounds) -> f64 {
    if risk <= 0.0 {
        return bounds.min_price;
    }
    if risk >= 1.0 {
        return bounds.max_price;
    }
    bounds.min_price * (bounds.max_price / bounds.min_price).powf(risk)
}
