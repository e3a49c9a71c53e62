//! Risk engine: the narrow contract collaborators call.
//!
//! Each asset's bounds and the grid generated from them live together in one
//! immutable [`Calibration`] snapshot. Updates build the next snapshot in full,
//! persist it, then replace the `Arc` in a single map write, so a reader sees
//! either the old pair or the new pair and never a mix. Writes to one asset
//! are serialized by a per-asset mutex.

use crate::domain::band::{classify, RiskBand, Zone};
use crate::domain::bounds::{normalize_asset, AssetBounds, BoundsSource};
use crate::domain::config_validation::EngineConfig;
use crate::domain::error::RiskError;
use crate::domain::governance::{Actor, FoundationGuard};
use crate::domain::grid::{generate_grid, RiskGrid, RiskGridPoint};
use crate::domain::occupancy::{
    lifetime_weighted_score, weigh, BandCoefficients, OccupancyProfile, WeightedRisk,
};
use crate::domain::transform::risk_of;
use crate::ports::bounds_port::BoundsStore;
use crate::ports::occupancy_port::OccupancyStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub bounds: AssetBounds,
    pub grid: RiskGrid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskReading {
    pub asset_id: String,
    pub price: f64,
    pub risk: f64,
    pub band: RiskBand,
    pub zone: Zone,
    pub signal: &'static str,
}

pub struct RiskEngine {
    bounds_store: Arc<dyn BoundsStore>,
    occupancy_store: Arc<dyn OccupancyStore>,
    guard: FoundationGuard,
    grid_steps: usize,
    calibrations: RwLock<HashMap<String, Arc<Calibration>>>,
    coefficients: RwLock<HashMap<String, Arc<BandCoefficients>>>,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

// A poisoned lock only means a panicking thread held it; the maps hold whole
// `Arc` snapshots, so the data is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn validate_price(price: f64) -> Result<(), RiskError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(RiskError::out_of_range("price", price));
    }
    Ok(())
}

impl RiskEngine {
    pub fn new(
        bounds_store: Arc<dyn BoundsStore>,
        occupancy_store: Arc<dyn OccupancyStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            bounds_store,
            occupancy_store,
            guard: FoundationGuard::new(&config.reference_asset, &config.admin_endpoint),
            grid_steps: config.grid_steps,
            calibrations: RwLock::new(HashMap::new()),
            coefficients: RwLock::new(HashMap::new()),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn guard(&self) -> &FoundationGuard {
        &self.guard
    }

    pub fn grid_steps(&self) -> usize {
        self.grid_steps
    }

    fn asset_lock(&self, asset_id: &str) -> Arc<Mutex<()>> {
        lock(&self.write_locks)
            .entry(asset_id.to_string())
            .or_default()
            .clone()
    }

    /// Current snapshot for `asset_id`, loading it from the store on a miss.
    pub fn calibration(&self, asset_id: &str) -> Result<Arc<Calibration>, RiskError> {
        let asset_id = normalize_asset(asset_id);
        if let Some(cal) = read(&self.calibrations).get(&asset_id) {
            return Ok(Arc::clone(cal));
        }

        // Unknown ids never get a write lock.
        if self.bounds_store.load_bounds(&asset_id)?.is_none() {
            return Err(RiskError::NotConfigured { asset: asset_id });
        }

        // Fill under the asset lock so a concurrent write cannot be overwritten
        // by an older store read.
        let asset_lock = self.asset_lock(&asset_id);
        let _held = lock(&*asset_lock);
        if let Some(cal) = read(&self.calibrations).get(&asset_id) {
            return Ok(Arc::clone(cal));
        }

        let bounds = self
            .bounds_store
            .load_bounds(&asset_id)?
            .ok_or_else(|| RiskError::NotConfigured {
                asset: asset_id.clone(),
            })?;
        let grid = match self.bounds_store.load_grid(&asset_id)? {
            Some(grid) if grid.matches(&bounds) && grid.len() == self.grid_steps => grid,
            _ => {
                tracing::debug!(asset = %asset_id, "stored grid missing or stale, regenerating");
                generate_grid(&bounds, self.grid_steps)?
            }
        };

        let cal = Arc::new(Calibration { bounds, grid });
        write(&self.calibrations).insert(asset_id, Arc::clone(&cal));
        Ok(cal)
    }

    pub fn get_bounds(&self, asset_id: &str) -> Result<AssetBounds, RiskError> {
        Ok(self.calibration(asset_id)?.bounds.clone())
    }

    pub fn list_assets(&self) -> Result<Vec<String>, RiskError> {
        let mut assets: Vec<String> = self
            .bounds_store
            .list_bounds()?
            .into_iter()
            .map(|b| b.asset_id)
            .collect();
        assets.sort();
        Ok(assets)
    }

    /// Exact risk, band, zone and signal for `price`.
    pub fn get_risk(&self, asset_id: &str, price: f64) -> Result<RiskReading, RiskError> {
        validate_price(price)?;
        let cal = self.calibration(asset_id)?;
        reading(&cal.bounds.asset_id, price, risk_of(price, &cal.bounds))
    }

    /// Batch lookup through the precomputed grid of a single snapshot.
    pub fn get_risks(&self, asset_id: &str, prices: &[f64]) -> Result<Vec<RiskReading>, RiskError> {
        let cal = self.calibration(asset_id)?;
        prices
            .iter()
            .map(|&price| {
                validate_price(price)?;
                let risk = cal
                    .grid
                    .risk_at(price)
                    .ok_or_else(|| RiskError::out_of_range("price", price))?;
                reading(&cal.bounds.asset_id, price, risk)
            })
            .collect()
    }

    pub fn get_weighted_risk(&self, asset_id: &str, price: f64) -> Result<WeightedRisk, RiskError> {
        let reading = self.get_risk(asset_id, price)?;
        let coefficients = self.band_coefficients(&reading.asset_id)?;
        weigh(reading.risk, &coefficients)
    }

    /// Grid at the configured resolution.
    pub fn get_grid(&self, asset_id: &str) -> Result<Vec<RiskGridPoint>, RiskError> {
        Ok(self.calibration(asset_id)?.grid.points.clone())
    }

    /// Grid at an arbitrary resolution, generated on demand and not cached.
    pub fn get_grid_with_steps(
        &self,
        asset_id: &str,
        steps: usize,
    ) -> Result<Vec<RiskGridPoint>, RiskError> {
        let cal = self.calibration(asset_id)?;
        if steps == cal.grid.len() {
            return Ok(cal.grid.points.clone());
        }
        Ok(generate_grid(&cal.bounds, steps)?.points)
    }

    pub fn set_bounds(
        &self,
        asset_id: &str,
        min_price: f64,
        max_price: f64,
        source: BoundsSource,
        actor: &Actor,
    ) -> Result<AssetBounds, RiskError> {
        self.guard.authorize_write(asset_id, actor)?;
        let bounds = AssetBounds::new(asset_id, min_price, max_price, source)?;
        self.commit(bounds, actor)
    }

    /// Bounds for `asset_id` scaled from the reference asset's current bounds.
    pub fn derive_bounds(
        &self,
        asset_id: &str,
        ratio_bottom: f64,
        ratio_top: f64,
        actor: &Actor,
    ) -> Result<AssetBounds, RiskError> {
        self.guard.authorize_write(asset_id, actor)?;
        if normalize_asset(asset_id) == self.guard.reference_asset() {
            return Err(RiskError::InvalidBounds {
                asset: normalize_asset(asset_id),
                reason: "the reference asset cannot be derived from itself".into(),
            });
        }
        let reference = self.get_bounds(self.guard.reference_asset())?;
        let bounds = AssetBounds::derive_from(asset_id, &reference, ratio_bottom, ratio_top)?;
        self.commit(bounds, actor)
    }

    /// Regenerate and persist the grid from the current bounds.
    pub fn recompute_grid(&self, asset_id: &str, actor: &Actor) -> Result<RiskGrid, RiskError> {
        self.guard.authorize_write(asset_id, actor)?;
        let asset_id = normalize_asset(asset_id);
        if self.bounds_store.load_bounds(&asset_id)?.is_none() {
            return Err(RiskError::NotConfigured { asset: asset_id });
        }
        let asset_lock = self.asset_lock(&asset_id);
        let _held = lock(&*asset_lock);

        let bounds = self
            .bounds_store
            .load_bounds(&asset_id)?
            .ok_or_else(|| RiskError::NotConfigured {
                asset: asset_id.clone(),
            })?;
        let grid = generate_grid(&bounds, self.grid_steps)?;
        self.bounds_store.save_calibration(&bounds, &grid)?;
        write(&self.calibrations).insert(
            asset_id.clone(),
            Arc::new(Calibration {
                bounds,
                grid: grid.clone(),
            }),
        );
        tracing::info!(asset = %asset_id, actor = %actor.name, points = grid.len(), "grid recomputed");
        Ok(grid)
    }

    fn commit(&self, bounds: AssetBounds, actor: &Actor) -> Result<AssetBounds, RiskError> {
        let grid = generate_grid(&bounds, self.grid_steps)?;
        let asset_id = bounds.asset_id.clone();

        {
            let asset_lock = self.asset_lock(&asset_id);
            let _held = lock(&*asset_lock);
            self.bounds_store.save_calibration(&bounds, &grid)?;
            write(&self.calibrations).insert(
                asset_id.clone(),
                Arc::new(Calibration {
                    bounds: bounds.clone(),
                    grid,
                }),
            );
        }

        tracing::info!(
            asset = %asset_id,
            actor = %actor.name,
            min_price = bounds.min_price,
            max_price = bounds.max_price,
            source = %bounds.source,
            "bounds updated"
        );

        if asset_id == self.guard.reference_asset() {
            let derived = self
                .bounds_store
                .list_bounds()?
                .into_iter()
                .filter(|b| b.source == BoundsSource::Derived)
                .count();
            if derived > 0 {
                tracing::warn!(
                    asset = %asset_id,
                    derived,
                    "reference bounds changed; derived assets keep their previous calibration"
                );
            }
        }

        Ok(bounds)
    }

    pub fn ingest_occupancy(
        &self,
        asset_id: &str,
        days_per_band: BTreeMap<RiskBand, u32>,
        total_days: u32,
    ) -> Result<OccupancyProfile, RiskError> {
        let profile = OccupancyProfile::new(asset_id, total_days, days_per_band)?;
        self.store_profile(&profile)?;
        Ok(profile)
    }

    /// Persist a prebuilt profile and drop the cached coefficients for it.
    pub fn store_profile(&self, profile: &OccupancyProfile) -> Result<(), RiskError> {
        {
            let asset_lock = self.asset_lock(&profile.asset_id);
            let _held = lock(&*asset_lock);
            self.occupancy_store.save_profile(profile)?;
            write(&self.coefficients).remove(&profile.asset_id);
        }
        tracing::info!(
            asset = %profile.asset_id,
            total_days = profile.total_days,
            classified = profile.classified_days(),
            "occupancy profile ingested"
        );
        Ok(())
    }

    pub fn occupancy_profile(&self, asset_id: &str) -> Result<Option<OccupancyProfile>, RiskError> {
        self.occupancy_store.load_profile(&normalize_asset(asset_id))
    }

    /// Rarity coefficients for `asset_id`; neutral when no profile exists.
    pub fn band_coefficients(&self, asset_id: &str) -> Result<Arc<BandCoefficients>, RiskError> {
        let asset_id = normalize_asset(asset_id);
        if let Some(c) = read(&self.coefficients).get(&asset_id) {
            return Ok(Arc::clone(c));
        }

        // Without a profile the weights are neutral and nothing is cached.
        if self.occupancy_store.load_profile(&asset_id)?.is_none() {
            return Ok(Arc::new(BandCoefficients {
                asset_id,
                coefficients: BTreeMap::new(),
            }));
        }

        let asset_lock = self.asset_lock(&asset_id);
        let _held = lock(&*asset_lock);
        if let Some(c) = read(&self.coefficients).get(&asset_id) {
            return Ok(Arc::clone(c));
        }
        let coefficients = match self.occupancy_store.load_profile(&asset_id)? {
            Some(profile) => BandCoefficients::compute(&profile),
            None => BandCoefficients {
                asset_id: asset_id.clone(),
                coefficients: BTreeMap::new(),
            },
        };
        let coefficients = Arc::new(coefficients);
        write(&self.coefficients).insert(asset_id, Arc::clone(&coefficients));
        Ok(coefficients)
    }

    pub fn lifetime_score(&self, asset_id: &str) -> Result<Option<f64>, RiskError> {
        Ok(self
            .occupancy_profile(asset_id)?
            .map(|p| lifetime_weighted_score(&p)))
    }
}

fn reading(asset_id: &str, price: f64, risk: f64) -> Result<RiskReading, RiskError> {
    let c = classify(risk)?;
    Ok(RiskReading {
        asset_id: asset_id.to_string(),
        price,
        risk,
        band: c.band,
        zone: c.zone,
        signal: c.signal,
    })
}
