//! Historical band occupancy and rarity coefficients.
//!
//! The most-occupied band weighs 1.00 and the rarest occupied band 1.60;
//! other occupied bands interpolate linearly on days spent. When every occupied
//! band has the same day count there is no rarity signal and all weigh 1.00.

use crate::domain::band::{band_of, RiskBand};
use crate::domain::bounds::{normalize_asset, AssetBounds};
use crate::domain::error::RiskError;
use crate::domain::transform::risk_of;
use std::collections::BTreeMap;

pub const COMMON_COEFFICIENT: f64 = 1.00;
pub const RARE_COEFFICIENT: f64 = 1.60;

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyProfile {
    pub asset_id: String,
    pub total_days: u32,
    pub days_per_band: BTreeMap<RiskBand, u32>,
}

impl OccupancyProfile {
    /// Validated constructor. Days may sum to less than `total_days`
    /// (unclassified days) but never more.
    pub fn new(
        asset_id: &str,
        total_days: u32,
        days_per_band: BTreeMap<RiskBand, u32>,
    ) -> Result<Self, RiskError> {
        let asset_id = normalize_asset(asset_id);
        if total_days == 0 {
            return Err(RiskError::InvalidProfile {
                asset: asset_id,
                reason: "total_days must be positive".into(),
            });
        }
        let classified: u64 = days_per_band.values().map(|&d| d as u64).sum();
        if classified > u64::from(total_days) {
            return Err(RiskError::InvalidProfile {
                asset: asset_id,
                reason: format!(
                    "banded days ({classified}) exceed total_days ({total_days})"
                ),
            });
        }
        Ok(Self {
            asset_id,
            total_days,
            days_per_band,
        })
    }

    pub fn days_in(&self, band: RiskBand) -> u32 {
        self.days_per_band.get(&band).copied().unwrap_or(0)
    }

    pub fn classified_days(&self) -> u64 {
        self.days_per_band.values().map(|&d| d as u64).sum()
    }

    pub fn occupied_bands(&self) -> impl Iterator<Item = (RiskBand, u32)> + '_ {
        self.days_per_band
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(b, d)| (*b, *d))
    }
}

/// Build a profile from a daily close history, one day per close. Closes that
/// are not positive finite numbers count toward `total_days` unclassified.
pub fn tally_occupancy(bounds: &AssetBounds, closes: &[f64]) -> Result<OccupancyProfile, RiskError> {
    let mut days_per_band: BTreeMap<RiskBand, u32> = BTreeMap::new();
    for &close in closes {
        if !close.is_finite() || close <= 0.0 {
            continue;
        }
        let band = band_of(risk_of(close, bounds))?;
        *days_per_band.entry(band).or_insert(0) += 1;
    }
    let total_days = u32::try_from(closes.len()).map_err(|_| RiskError::InvalidProfile {
        asset: bounds.asset_id.clone(),
        reason: format!("{} closes exceed the day counter", closes.len()),
    })?;
    OccupancyProfile::new(&bounds.asset_id, total_days, days_per_band)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandCoefficients {
    pub asset_id: String,
    pub coefficients: BTreeMap<RiskBand, f64>,
}

impl BandCoefficients {
    pub fn compute(profile: &OccupancyProfile) -> Self {
        let occupied: Vec<(RiskBand, u32)> = profile.occupied_bands().collect();
        let max_days = occupied.iter().map(|(_, d)| *d).max().unwrap_or(0);
        let min_days = occupied.iter().map(|(_, d)| *d).min().unwrap_or(0);

        let coefficients = occupied
            .into_iter()
            .map(|(band, days)| {
                let coefficient = if max_days == min_days || days == max_days {
                    COMMON_COEFFICIENT
                } else if days == min_days {
                    RARE_COEFFICIENT
                } else {
                    RARE_COEFFICIENT
                        - (days - min_days) as f64 * (RARE_COEFFICIENT - COMMON_COEFFICIENT)
                            / (max_days - min_days) as f64
                };
                (band, coefficient)
            })
            .collect();

        Self {
            asset_id: profile.asset_id.clone(),
            coefficients,
        }
    }

    /// A band the asset never occupied counts as rarest; with no occupancy at
    /// all there is no signal and the weight is neutral.
    pub fn coefficient_for(&self, band: RiskBand) -> f64 {
        match self.coefficients.get(&band) {
            Some(c) => *c,
            None if self.coefficients.is_empty() => COMMON_COEFFICIENT,
            None => RARE_COEFFICIENT,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.coefficients.values().all(|&c| c == COMMON_COEFFICIENT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRisk {
    pub raw_risk: f64,
    pub adjusted_risk: f64,
    pub coefficient: f64,
    pub band: RiskBand,
}

/// Raw risk scaled by its band's rarity coefficient. The adjusted value may
/// exceed 1.0 in rare territory.
pub fn weigh(raw_risk: f64, coefficients: &BandCoefficients) -> Result<WeightedRisk, RiskError> {
    let band = band_of(raw_risk)?;
    let coefficient = coefficients.coefficient_for(band);
    Ok(WeightedRisk {
        raw_risk,
        adjusted_risk: raw_risk * coefficient,
        coefficient,
        band,
    })
}

pub fn weighted_risk_score(
    risk: f64,
    bounds: &AssetBounds,
    profile: &OccupancyProfile,
) -> Result<WeightedRisk, RiskError> {
    if profile.asset_id != bounds.asset_id {
        return Err(RiskError::InvalidProfile {
            asset: profile.asset_id.clone(),
            reason: format!("profile does not belong to {}", bounds.asset_id),
        });
    }
    weigh(risk, &BandCoefficients::compute(profile))
}

/// Σ band_center * days / total_days over all bands.
pub fn lifetime_weighted_score(profile: &OccupancyProfile) -> f64 {
    profile
        .days_per_band
        .iter()
        .map(|(band, &days)| band.center() * days as f64)
        .sum::<f64>()
        / profile.total_days as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bounds::BoundsSource;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn band(label: &str) -> RiskBand {
        label.parse().unwrap()
    }

    fn profile(entries: &[(&str, u32)], total: u32) -> OccupancyProfile {
        let days = entries.iter().map(|(l, d)| (band(l), *d)).collect();
        OccupancyProfile::new("BTC", total, days).unwrap()
    }

    #[test]
    fn two_band_extremes() {
        let p = profile(&[("band_0_10", 50), ("band_50_60", 400)], 730);
        let c = BandCoefficients::compute(&p);
        assert_eq!(c.coefficient_for(band("band_50_60")), 1.00);
        assert_eq!(c.coefficient_for(band("band_0_10")), 1.60);
        assert_eq!(c.coefficients.len(), 2);
    }

    #[test]
    fn interpolates_middle_bands() {
        let p = profile(
            &[("band_10_20", 100), ("band_20_30", 250), ("band_30_40", 400)],
            800,
        );
        let c = BandCoefficients::compute(&p);
        assert_eq!(c.coefficient_for(band("band_30_40")), 1.00);
        assert_eq!(c.coefficient_for(band("band_10_20")), 1.60);
        assert_relative_eq!(c.coefficient_for(band("band_20_30")), 1.30, epsilon = 1e-12);
    }

    #[test]
    fn equal_occupancy_is_neutral() {
        let p = profile(&[("band_10_20", 100), ("band_60_70", 100)], 300);
        let c = BandCoefficients::compute(&p);
        assert!(c.is_degenerate());
        assert_eq!(c.coefficient_for(band("band_10_20")), 1.00);
        assert_eq!(c.coefficient_for(band("band_60_70")), 1.00);
    }

    #[test]
    fn single_band_is_neutral() {
        let p = profile(&[("band_40_50", 365)], 365);
        let c = BandCoefficients::compute(&p);
        assert_eq!(c.coefficient_for(band("band_40_50")), 1.00);
    }

    #[test]
    fn zero_day_bands_are_not_occupied() {
        let p = profile(&[("band_0_10", 0), ("band_20_30", 10), ("band_30_40", 20)], 30);
        let c = BandCoefficients::compute(&p);
        assert_eq!(c.coefficients.len(), 2);
        assert_eq!(c.coefficient_for(band("band_20_30")), 1.60);
    }

    #[test]
    fn unoccupied_band_weighs_as_rarest() {
        let p = profile(&[("band_0_10", 50), ("band_50_60", 400)], 730);
        let c = BandCoefficients::compute(&p);
        assert_eq!(c.coefficient_for(band("band_90_100")), RARE_COEFFICIENT);

        let empty = profile(&[], 10);
        let c = BandCoefficients::compute(&empty);
        assert_eq!(c.coefficient_for(band("band_90_100")), COMMON_COEFFICIENT);
    }

    #[test]
    fn profile_rejects_overfull_days() {
        let days = [(band("band_0_10"), 10)].into_iter().collect();
        let err = OccupancyProfile::new("BTC", 5, days).unwrap_err();
        assert!(matches!(err, RiskError::InvalidProfile { .. }));
        assert!(OccupancyProfile::new("BTC", 0, BTreeMap::new()).is_err());
    }

    #[test]
    fn classified_days_does_not_wrap() {
        let mut p = profile(&[("band_0_10", 1)], 1);
        p.days_per_band.insert(band("band_0_10"), u32::MAX);
        p.days_per_band.insert(band("band_10_20"), u32::MAX);
        assert_eq!(p.classified_days(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn weighted_score_amplifies_rare_band() {
        let bounds = AssetBounds::new("BTC", 30_000.0, 299_720.0, BoundsSource::Fixed).unwrap();
        let p = profile(&[("band_0_10", 50), ("band_50_60", 400)], 730);

        let w = weighted_risk_score(0.05, &bounds, &p).unwrap();
        assert_eq!(w.coefficient, 1.60);
        assert_relative_eq!(w.adjusted_risk, 0.08, epsilon = 1e-12);

        let w = weighted_risk_score(0.55, &bounds, &p).unwrap();
        assert_eq!(w.coefficient, 1.00);
        assert_relative_eq!(w.adjusted_risk, 0.55);
    }

    #[test]
    fn weighted_score_rejects_foreign_profile() {
        let bounds = AssetBounds::new("ETH", 100.0, 10_000.0, BoundsSource::Fixed).unwrap();
        let p = profile(&[("band_0_10", 50)], 730);
        assert!(weighted_risk_score(0.05, &bounds, &p).is_err());
    }

    #[test]
    fn lifetime_score_uses_centers() {
        let p = profile(&[("band_0_10", 50), ("band_50_60", 400)], 730);
        let expected = (0.05 * 50.0 + 0.55 * 400.0) / 730.0;
        assert_relative_eq!(lifetime_weighted_score(&p), expected, epsilon = 1e-12);
    }

    #[test]
    fn tally_counts_days_per_band() {
        let bounds = AssetBounds::new("BTC", 100.0, 10_000.0, BoundsSource::Fixed).unwrap();
        // risk 0, ~0.59 twice, 1.0, and one bad close.
        let closes = [100.0, 1_500.0, 1_500.0, 10_000.0, -1.0];
        let p = tally_occupancy(&bounds, &closes).unwrap();
        assert_eq!(p.total_days, 5);
        assert_eq!(p.classified_days(), 4);
        assert_eq!(p.days_in(band("band_0_10")), 1);
        assert_eq!(p.days_in(band("band_50_60")), 2);
        assert_eq!(p.days_in(band("band_90_100")), 1);
    }

    proptest! {
        #[test]
        fn coefficients_stay_within_range(days in proptest::collection::vec(1u32..5_000, 2..10)) {
            let map: BTreeMap<RiskBand, u32> = days
                .iter()
                .enumerate()
                .map(|(i, d)| (RiskBand::from_index(i).unwrap(), *d))
                .collect();
            let total = map.values().sum::<u32>();
            let p = OccupancyProfile::new("X", total, map).unwrap();
            let c = BandCoefficients::compute(&p);
            for v in c.coefficients.values() {
                prop_assert!(*v >= COMMON_COEFFICIENT && *v <= RARE_COEFFICIENT);
            }
        }

        #[test]
        fn distinct_counts_have_one_common_and_one_rare_band(
            days in proptest::collection::vec(1u32..5_000, 2..10)
        ) {
            let distinct: std::collections::BTreeSet<u32> = days.iter().copied().collect();
            prop_assume!(distinct.len() == days.len());

            let map: BTreeMap<RiskBand, u32> = days
                .iter()
                .enumerate()
                .map(|(i, d)| (RiskBand::from_index(i).unwrap(), *d))
                .collect();
            let total = map.values().sum::<u32>();
            let p = OccupancyProfile::new("X", total, map).unwrap();
            let c = BandCoefficients::compute(&p);

            let common = c.coefficients.values().filter(|&&v| v == COMMON_COEFFICIENT).count();
            let rare = c.coefficients.values().filter(|&&v| v == RARE_COEFFICIENT).count();
            prop_assert_eq!(common, 1);
            prop_assert_eq!(rare, 1);
        }
    }
}
