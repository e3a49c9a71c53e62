//! Configuration access port.
//!
//! Keys are addressed by INI section and name; `get_int` falls back to
//! `default` when the key is absent or unparsable.

use crate::domain::error::RiskError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;

    /// Like `get_string`, but a missing or blank value is `ConfigMissing`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, RiskError> {
        match self.get_string(section, key) {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(RiskError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            }),
        }
    }
}
