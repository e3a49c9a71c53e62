//! SQLite store for bounds, grids and occupancy.

use crate::domain::band::RiskBand;
use crate::domain::bounds::{AssetBounds, BoundsSource};
use crate::domain::error::RiskError;
use crate::domain::grid::{RiskGrid, RiskGridPoint};
use crate::domain::occupancy::OccupancyProfile;
use crate::ports::bounds_port::BoundsStore;
use crate::ports::config_port::ConfigPort;
use crate::ports::occupancy_port::OccupancyStore;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn query_err(e: rusqlite::Error) -> RiskError {
    RiskError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err(column: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_bounds(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssetBounds> {
    let source_str: String = row.get(3)?;
    let source = source_str
        .parse::<BoundsSource>()
        .map_err(|e| conversion_err(3, std::io::Error::other(e)))?;
    let updated_str: String = row.get(4)?;
    let updated_at = DateTime::parse_from_rfc3339(&updated_str)
        .map_err(|e| conversion_err(4, e))?
        .with_timezone(&Utc);
    Ok(AssetBounds {
        asset_id: row.get(0)?,
        min_price: row.get(1)?,
        max_price: row.get(2)?,
        source,
        updated_at,
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RiskError> {
        let db_path = config.require_string("sqlite", "path")?;
        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| RiskError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, RiskError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| RiskError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, RiskError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| RiskError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), RiskError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS asset_bounds (
                asset_id TEXT PRIMARY KEY,
                min_price REAL NOT NULL CHECK (min_price > 0),
                max_price REAL NOT NULL,
                source TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (max_price > min_price)
            );
            CREATE TABLE IF NOT EXISTS risk_grid (
                asset_id TEXT NOT NULL,
                risk REAL NOT NULL,
                price REAL NOT NULL,
                PRIMARY KEY (asset_id, risk)
            );
            CREATE TABLE IF NOT EXISTS band_occupancy (
                asset_id TEXT NOT NULL,
                band_label TEXT NOT NULL,
                days INTEGER NOT NULL CHECK (days >= 0),
                PRIMARY KEY (asset_id, band_label)
            );
            CREATE TABLE IF NOT EXISTS occupancy_totals (
                asset_id TEXT PRIMARY KEY,
                total_days INTEGER NOT NULL CHECK (total_days > 0)
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }
}

impl BoundsStore for SqliteAdapter {
    fn load_bounds(&self, asset_id: &str) -> Result<Option<AssetBounds>, RiskError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT asset_id, min_price, max_price, source, updated_at
             FROM asset_bounds WHERE asset_id = ?1",
            params![asset_id],
            row_to_bounds,
        )
        .optional()
        .map_err(query_err)
    }

    fn list_bounds(&self) -> Result<Vec<AssetBounds>, RiskError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT asset_id, min_price, max_price, source, updated_at
                 FROM asset_bounds ORDER BY asset_id",
            )
            .map_err(query_err)?;

        let rows = stmt.query_map([], row_to_bounds).map_err(query_err)?;

        let mut all = Vec::new();
        for row in rows {
            all.push(row.map_err(query_err)?);
        }
        Ok(all)
    }

    fn save_calibration(&self, bounds: &AssetBounds, grid: &RiskGrid) -> Result<(), RiskError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "INSERT OR REPLACE INTO asset_bounds (asset_id, min_price, max_price, source, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                bounds.asset_id,
                bounds.min_price,
                bounds.max_price,
                bounds.source.as_str(),
                bounds.updated_at.to_rfc3339()
            ],
        )
        .map_err(query_err)?;

        tx.execute(
            "DELETE FROM risk_grid WHERE asset_id = ?1",
            params![bounds.asset_id],
        )
        .map_err(query_err)?;

        for point in &grid.points {
            tx.execute(
                "INSERT INTO risk_grid (asset_id, risk, price) VALUES (?1, ?2, ?3)",
                params![bounds.asset_id, point.risk, point.price],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }

    fn load_grid(&self, asset_id: &str) -> Result<Option<RiskGrid>, RiskError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT risk, price FROM risk_grid WHERE asset_id = ?1 ORDER BY risk ASC")
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![asset_id], |row| {
                Ok(RiskGridPoint {
                    asset_id: asset_id.to_string(),
                    risk: row.get(0)?,
                    price: row.get(1)?,
                })
            })
            .map_err(query_err)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(query_err)?);
        }

        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(RiskGrid {
            asset_id: asset_id.to_string(),
            points,
        }))
    }
}

impl OccupancyStore for SqliteAdapter {
    fn load_profile(&self, asset_id: &str) -> Result<Option<OccupancyProfile>, RiskError> {
        let conn = self.conn()?;

        let total: Option<i64> = conn
            .query_row(
                "SELECT total_days FROM occupancy_totals WHERE asset_id = ?1",
                params![asset_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?;
        let Some(total) = total else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare("SELECT band_label, days FROM band_occupancy WHERE asset_id = ?1")
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![asset_id], |row| {
                let label: String = row.get(0)?;
                let band = label
                    .parse::<RiskBand>()
                    .map_err(|e| conversion_err(0, std::io::Error::other(e)))?;
                let days: i64 = row.get(1)?;
                Ok((band, days as u32))
            })
            .map_err(query_err)?;

        let mut days_per_band = BTreeMap::new();
        for row in rows {
            let (band, days) = row.map_err(query_err)?;
            days_per_band.insert(band, days);
        }

        OccupancyProfile::new(asset_id, total as u32, days_per_band).map(Some)
    }

    fn save_profile(&self, profile: &OccupancyProfile) -> Result<(), RiskError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "INSERT OR REPLACE INTO occupancy_totals (asset_id, total_days) VALUES (?1, ?2)",
            params![profile.asset_id, profile.total_days as i64],
        )
        .map_err(query_err)?;
        tx.execute(
            "DELETE FROM band_occupancy WHERE asset_id = ?1",
            params![profile.asset_id],
        )
        .map_err(query_err)?;

        for (band, days) in &profile.days_per_band {
            tx.execute(
                "INSERT INTO band_occupancy (asset_id, band_label, days) VALUES (?1, ?2, ?3)",
                params![profile.asset_id, band.label(), *days as i64],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(())
    }
}
