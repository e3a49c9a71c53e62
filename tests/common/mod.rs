#![allow(dead_code)]

use riskmetric::adapters::memory_adapter::MemoryStore;
use riskmetric::domain::band::RiskBand;
use riskmetric::domain::bounds::BoundsSource;
use riskmetric::domain::config_validation::EngineConfig;
use riskmetric::domain::engine::RiskEngine;
use riskmetric::domain::governance::Actor;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

pub const BTC_MIN: f64 = 30_000.0;
pub const BTC_MAX: f64 = 299_720.0;

pub fn memory_engine() -> (RiskEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = RiskEngine::new(store.clone(), store.clone(), &EngineConfig::default());
    (engine, store)
}

pub fn admin() -> Actor {
    Actor::admin("ops")
}

pub fn agent() -> Actor {
    Actor::writer("rebalance-agent")
}

/// Engine with BTC seeded at the reference bounds and ETH derived from it.
pub fn seeded_engine() -> RiskEngine {
    let (engine, _) = memory_engine();
    engine
        .set_bounds("BTC", BTC_MIN, BTC_MAX, BoundsSource::Fixed, &admin())
        .unwrap();
    engine.derive_bounds("ETH", 0.05, 0.04, &agent()).unwrap();
    engine
}

pub fn days(entries: &[(&str, u32)]) -> BTreeMap<RiskBand, u32> {
    entries
        .iter()
        .map(|(label, d)| (label.parse::<RiskBand>().unwrap(), *d))
        .collect()
}

pub fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
