//! Occupancy profile storage port trait.

use crate::domain::error::RiskError;
use crate::domain::occupancy::OccupancyProfile;

pub trait OccupancyStore: Send + Sync {
    fn load_profile(&self, asset_id: &str) -> Result<Option<OccupancyProfile>, RiskError>;

    /// Replace the stored profile for `profile.asset_id`.
    fn save_profile(&self, profile: &OccupancyProfile) -> Result<(), RiskError>;
}
