//! Foundation governance for the reference asset.
//!
//! Derived bounds are calibrated against the reference asset, so its bounds
//! and grid may only be rewritten by an actor holding the admin capability.
//! Every other asset is open to any writer. Reads are never gated.

use crate::domain::bounds::normalize_asset;
use crate::domain::error::RiskError;

pub const DEFAULT_REFERENCE_ASSET: &str = "BTC";
pub const DEFAULT_ADMIN_ENDPOINT: &str = "/admin/bounds";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Write,
    Admin,
}

/// Caller identity for write operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub capabilities: Vec<Capability>,
}

impl Actor {
    /// An automated writer (ingestion job, agent).
    pub fn writer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: vec![Capability::Write],
        }
    }

    pub fn admin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: vec![Capability::Write, Capability::Admin],
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceState {
    Governed,
    Open,
}

#[derive(Debug, Clone)]
pub struct FoundationGuard {
    reference_asset: String,
    admin_endpoint: String,
}

impl Default for FoundationGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_ASSET, DEFAULT_ADMIN_ENDPOINT)
    }
}

impl FoundationGuard {
    pub fn new(reference_asset: &str, admin_endpoint: &str) -> Self {
        Self {
            reference_asset: normalize_asset(reference_asset),
            admin_endpoint: admin_endpoint.to_string(),
        }
    }

    pub fn reference_asset(&self) -> &str {
        &self.reference_asset
    }

    pub fn admin_endpoint(&self) -> &str {
        &self.admin_endpoint
    }

    pub fn state_of(&self, asset_id: &str) -> GovernanceState {
        if normalize_asset(asset_id) == self.reference_asset {
            GovernanceState::Governed
        } else {
            GovernanceState::Open
        }
    }

    /// Gate for bounds writes and grid recomputation.
    pub fn authorize_write(&self, asset_id: &str, actor: &Actor) -> Result<(), RiskError> {
        let allowed = match self.state_of(asset_id) {
            GovernanceState::Governed => actor.has(Capability::Admin),
            GovernanceState::Open => actor.has(Capability::Write) || actor.has(Capability::Admin),
        };
        if allowed {
            return Ok(());
        }
        tracing::warn!(
            asset = %normalize_asset(asset_id),
            actor = %actor.name,
            "bounds write refused"
        );
        Err(RiskError::Permission {
            asset: normalize_asset(asset_id),
            admin_endpoint: self.admin_endpoint.clone(),
        })
    }
}
