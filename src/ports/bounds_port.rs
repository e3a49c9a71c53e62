//! Bounds and grid storage port trait.

use crate::domain::bounds::AssetBounds;
use crate::domain::error::RiskError;
use crate::domain::grid::RiskGrid;

/// Persistent store for the bounds table (keyed by asset) and the derived
/// grid table (keyed by asset and risk).
pub trait BoundsStore: Send + Sync {
    fn load_bounds(&self, asset_id: &str) -> Result<Option<AssetBounds>, RiskError>;

    fn list_bounds(&self) -> Result<Vec<AssetBounds>, RiskError>;

    /// Write bounds and the grid generated from them together.
    fn save_calibration(&self, bounds: &AssetBounds, grid: &RiskGrid) -> Result<(), RiskError>;

    fn load_grid(&self, asset_id: &str) -> Result<Option<RiskGrid>, RiskError>;
}
