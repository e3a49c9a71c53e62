//! Daily price history port trait.

use crate::domain::error::RiskError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

pub trait PriceHistoryPort {
    /// Closes for `asset_id` in ascending date order.
    fn fetch_closes(&self, asset_id: &str) -> Result<Vec<DailyClose>, RiskError>;
}
