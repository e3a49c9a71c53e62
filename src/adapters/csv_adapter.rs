//! CSV files: bounds seeds, occupancy tables, price history and grid export.
//!
//! Formats (all with a header row):
//! - bounds seed: `asset_id,min_price,max_price,source`
//! - occupancy: `asset_id,total_days,band_label,days`
//! - price history: `<base>/<ASSET>.csv` with `date,close`
//! - grid export: `asset_id,risk,price`

use crate::domain::band::RiskBand;
use crate::domain::bounds::{normalize_asset, AssetBounds, BoundsSource};
use crate::domain::error::RiskError;
use crate::domain::grid::RiskGridPoint;
use crate::domain::occupancy::OccupancyProfile;
use crate::ports::price_history_port::{DailyClose, PriceHistoryPort};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn read_records(path: &Path) -> Result<Vec<csv::StringRecord>, RiskError> {
    let content = fs::read_to_string(path).map_err(|e| RiskError::Database {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut records = Vec::new();
    for result in rdr.records() {
        records.push(result.map_err(|e| RiskError::Database {
            reason: format!("CSV parse error: {}", e),
        })?);
    }
    Ok(records)
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str) -> Result<&'a str, RiskError> {
    record.get(idx).ok_or_else(|| RiskError::Database {
        reason: format!("missing {} column", name),
    })
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
) -> Result<T, RiskError>
where
    T::Err: std::fmt::Display,
{
    field(record, idx, name)?
        .parse()
        .map_err(|e: T::Err| RiskError::Database {
            reason: format!("invalid {} value: {}", name, e),
        })
}

pub fn read_bounds_seed(path: &Path) -> Result<Vec<AssetBounds>, RiskError> {
    read_records(path)?
        .iter()
        .map(|record| {
            let asset_id = field(record, 0, "asset_id")?;
            let min_price: f64 = parse_field(record, 1, "min_price")?;
            let max_price: f64 = parse_field(record, 2, "max_price")?;
            let source = match record.get(3).filter(|s| !s.is_empty()) {
                Some(s) => s.parse::<BoundsSource>().map_err(|e| RiskError::Database {
                    reason: format!("invalid source value: {}", e),
                })?,
                None => BoundsSource::Fixed,
            };
            AssetBounds::new(asset_id, min_price, max_price, source)
        })
        .collect()
}

pub fn read_occupancy(path: &Path) -> Result<Vec<OccupancyProfile>, RiskError> {
    let mut grouped: BTreeMap<String, (u32, BTreeMap<RiskBand, u32>)> = BTreeMap::new();

    for record in read_records(path)? {
        let asset_id = normalize_asset(field(&record, 0, "asset_id")?);
        let total_days: u32 = parse_field(&record, 1, "total_days")?;
        let band: RiskBand = parse_field(&record, 2, "band_label")?;
        let days: u32 = parse_field(&record, 3, "days")?;

        let entry = grouped
            .entry(asset_id.clone())
            .or_insert_with(|| (total_days, BTreeMap::new()));
        if entry.0 != total_days {
            return Err(RiskError::InvalidProfile {
                asset: asset_id,
                reason: format!("conflicting total_days {} and {}", entry.0, total_days),
            });
        }
        let slot = entry.1.entry(band).or_insert(0);
        *slot = slot.checked_add(days).ok_or_else(|| RiskError::InvalidProfile {
            asset: asset_id.clone(),
            reason: format!("day count for {} overflows", band.label()),
        })?;
    }

    grouped
        .into_iter()
        .map(|(asset_id, (total_days, days))| OccupancyProfile::new(&asset_id, total_days, days))
        .collect()
}

pub fn write_grid(path: &Path, points: &[RiskGridPoint]) -> Result<(), RiskError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| RiskError::Database {
        reason: format!("failed to create {}: {}", path.display(), e),
    })?;
    let write_err = |e: csv::Error| RiskError::Database {
        reason: format!("CSV write error: {}", e),
    };

    wtr.write_record(["asset_id", "risk", "price"])
        .map_err(write_err)?;
    for p in points {
        wtr.write_record([p.asset_id.clone(), format!("{:.3}", p.risk), format!("{:.8}", p.price)])
            .map_err(write_err)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Daily closes stored as one `<ASSET>.csv` per asset under `base_path`.
pub struct CsvPriceHistory {
    base_path: PathBuf,
}

impl CsvPriceHistory {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", normalize_asset(asset_id)))
    }
}

impl PriceHistoryPort for CsvPriceHistory {
    fn fetch_closes(&self, asset_id: &str) -> Result<Vec<DailyClose>, RiskError> {
        let path = self.csv_path(asset_id);
        let mut closes = read_records(&path)?
            .iter()
            .map(|record| {
                let date_str = field(record, 0, "date")?;
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                    RiskError::Database {
                        reason: format!("invalid date format: {}", e),
                    }
                })?;
                let close: f64 = parse_field(record, 1, "close")?;
                Ok(DailyClose { date, close })
            })
            .collect::<Result<Vec<_>, RiskError>>()?;

        closes.sort_by_key(|c| c.date);
        Ok(closes)
    }
}
