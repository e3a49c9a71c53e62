//! Core domain types and logic.

pub mod bounds;
pub mod transform;
pub mod grid;
pub mod band;
pub mod occupancy;
pub mod governance;
pub mod engine;
pub mod config_validation;
pub mod error;
