//! Port traits: the seams between the engine and its storage and config.

pub mod bounds_port;
pub mod config_port;
pub mod occupancy_port;
pub mod price_history_port;
