//! Simulation settings.
//!
//! Every setting has a default, so a JSON document only needs to name what it changes:
//!
//! ```
//! use faultsim_engine::config::SimConfig;
//! use faultsim_engine::func::XorConflict;
//!
//! let config = SimConfig::from_json(r#"{ "xor_conflict": "exact", "scan": { "cycles": 4 } }"#).unwrap();
//! assert_eq!(config.xor_conflict, XorConflict::Exact);
//! assert_eq!(config.scan.cycles, Some(4));
//! assert_eq!(config.vector_cap, 100);
//! ```

use serde::{Deserialize, Serialize};

use crate::func::XorConflict;

/// Error raised when a configuration cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON for this configuration.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings of a fault simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// How XOR/XNOR gates treat several inputs carrying a fault effect.
    pub xor_conflict: XorConflict,
    /// The largest number of vectors a generator produces.
    pub vector_cap: usize,
    /// Scan settings.
    pub scan: ScanConfig,
}
impl Default for SimConfig {
    fn default() -> Self {
        Self {
            xor_conflict: XorConflict::default(),
            vector_cap: 100,
            scan: ScanConfig::default(),
        }
    }
}
impl SimConfig {
    /// Loads a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Settings of a scan (sequential) simulation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// The number of capture cycles to simulate per fault.
    ///
    /// If unset, the circuit's flip-flop resolution length is used.
    pub cycles: Option<usize>,
}

/// A test vector generator setup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// A name for reports.
    pub name: String,
    /// The seed.
    pub seed: u64,
    /// LFSR tap positions (`1..=7`). An empty list selects a counter.
    pub taps: Vec<u32>,
}
impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { name: "lfsr".to_string(), seed: 0x1234_5678_9abc, taps: vec![2, 7] }
    }
}
impl GeneratorConfig {
    /// Creates a configuration.
    pub fn new(name: &str, seed: u64, taps: &[u32]) -> Self {
        Self { name: name.to_string(), seed, taps: taps.to_vec() }
    }

    /// Loads a list of configurations from a JSON array.
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The stock generator setups compared against each other: a counter and four LFSR tap sets.
pub fn standard_generators(seed: u64) -> Vec<GeneratorConfig> {
    vec![
        GeneratorConfig::new("counter", seed, &[]),
        GeneratorConfig::new("lfsr (no taps)", seed, &[1]),
        GeneratorConfig::new("lfsr (2, 4, 5)", seed, &[2, 4, 5]),
        GeneratorConfig::new("lfsr (2, 3, 4)", seed, &[2, 3, 4]),
        GeneratorConfig::new("lfsr (3, 5, 7)", seed, &[3, 5, 7]),
    ]
}
