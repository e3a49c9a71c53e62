//! Engine configuration and its validation.
//!
//! Reads the `[engine]` section; every field has a default so an empty file
//! yields a working configuration.

use crate::domain::error::RiskError;
use crate::domain::governance::{DEFAULT_ADMIN_ENDPOINT, DEFAULT_REFERENCE_ASSET};
use crate::domain::grid::DEFAULT_GRID_STEPS;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub reference_asset: String,
    pub admin_endpoint: String,
    pub grid_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_asset: DEFAULT_REFERENCE_ASSET.to_string(),
            admin_endpoint: DEFAULT_ADMIN_ENDPOINT.to_string(),
            grid_steps: DEFAULT_GRID_STEPS,
        }
    }
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), RiskError> {
    validate_reference_asset(config)?;
    validate_admin_endpoint(config)?;
    validate_grid_steps(config)?;
    validate_pool_size(config)?;
    Ok(())
}

pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, RiskError> {
    validate_engine_config(config)?;
    let defaults = EngineConfig::default();
    Ok(EngineConfig {
        reference_asset: config
            .get_string("engine", "reference_asset")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or(defaults.reference_asset),
        admin_endpoint: config
            .get_string("engine", "admin_endpoint")
            .map(|s| s.trim().to_string())
            .unwrap_or(defaults.admin_endpoint),
        grid_steps: config.get_int("engine", "grid_steps", DEFAULT_GRID_STEPS as i64) as usize,
    })
}

fn validate_reference_asset(config: &dyn ConfigPort) -> Result<(), RiskError> {
    match config.get_string("engine", "reference_asset") {
        Some(s) if s.trim().is_empty() => Err(RiskError::ConfigInvalid {
            section: "engine".to_string(),
            key: "reference_asset".to_string(),
            reason: "reference_asset must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_admin_endpoint(config: &dyn ConfigPort) -> Result<(), RiskError> {
    match config.get_string("engine", "admin_endpoint") {
        Some(s) if s.trim().is_empty() => Err(RiskError::ConfigInvalid {
            section: "engine".to_string(),
            key: "admin_endpoint".to_string(),
            reason: "admin_endpoint must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_grid_steps(config: &dyn ConfigPort) -> Result<(), RiskError> {
    let value = config.get_int("engine", "grid_steps", DEFAULT_GRID_STEPS as i64);
    if value < 2 {
        return Err(RiskError::ConfigInvalid {
            section: "engine".to_string(),
            key: "grid_steps".to_string(),
            reason: "grid_steps must be at least 2".to_string(),
        });
    }
    Ok(())
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<(), RiskError> {
    let value = config.get_int("sqlite", "pool_size", 4);
    if value < 1 {
        return Err(RiskError::ConfigInvalid {
            section: "sqlite".to_string(),
            key: "pool_size".to_string(),
            reason: "pool_size must be positive".to_string(),
        });
    }
    Ok(())
}
