//! In-memory store for bounds, grids and occupancy profiles.

use crate::domain::bounds::AssetBounds;
use crate::domain::error::RiskError;
use crate::domain::grid::RiskGrid;
use crate::domain::occupancy::OccupancyProfile;
use crate::ports::bounds_port::BoundsStore;
use crate::ports::occupancy_port::OccupancyStore;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    bounds: HashMap<String, AssetBounds>,
    grids: HashMap<String, RiskGrid>,
    profiles: HashMap<String, OccupancyProfile>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RiskError {
        RiskError::Database {
            reason: "memory store lock poisoned".into(),
        }
    }
}

impl BoundsStore for MemoryStore {
    fn load_bounds(&self, asset_id: &str) -> Result<Option<AssetBounds>, RiskError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.bounds.get(asset_id).cloned())
    }

    fn list_bounds(&self) -> Result<Vec<AssetBounds>, RiskError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<AssetBounds> = tables.bounds.values().cloned().collect();
        all.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        Ok(all)
    }

    fn save_calibration(&self, bounds: &AssetBounds, grid: &RiskGrid) -> Result<(), RiskError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables.bounds.insert(bounds.asset_id.clone(), bounds.clone());
        tables.grids.insert(bounds.asset_id.clone(), grid.clone());
        Ok(())
    }

    fn load_grid(&self, asset_id: &str) -> Result<Option<RiskGrid>, RiskError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.grids.get(asset_id).cloned())
    }
}

impl OccupancyStore for MemoryStore {
    fn load_profile(&self, asset_id: &str) -> Result<Option<OccupancyProfile>, RiskError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.profiles.get(asset_id).cloned())
    }

    fn save_profile(&self, profile: &OccupancyProfile) -> Result<(), RiskError> {
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables
            .profiles
            .insert(profile.asset_id.clone(), profile.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bounds::BoundsSource;
    use crate::domain::grid::generate_grid;

    #[test]
    fn saves_bounds_and_grid_together() {
        let store = MemoryStore::new();
        let bounds = AssetBounds::new("ETH", 100.0, 5_000.0, BoundsSource::Fixed).unwrap();
        let grid = generate_grid(&bounds, 41).unwrap();
        store.save_calibration(&bounds, &grid).unwrap();

        assert_eq!(store.load_bounds("ETH").unwrap(), Some(bounds));
        assert_eq!(store.load_grid("ETH").unwrap().unwrap().len(), 41);
        assert!(store.load_bounds("SOL").unwrap().is_none());
    }

    #[test]
    fn profile_replaced_on_save() {
        let store = MemoryStore::new();
        let first = OccupancyProfile::new("ETH", 10, Default::default()).unwrap();
        let second = OccupancyProfile::new("ETH", 20, Default::default()).unwrap();
        store.save_profile(&first).unwrap();
        store.save_profile(&second).unwrap();
        assert_eq!(store.load_profile("ETH").unwrap().unwrap().total_days, 20);
    }
}
