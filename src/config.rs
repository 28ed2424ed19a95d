//! TOML configuration for policyguard.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working service. Lookup order is: explicit path, `POLICYGUARD_CONFIG`,
//! `./policyguard.toml`, then compiled-in defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::simulate::log::DEFAULT_LOG_CAPACITY;
use crate::simulate::Action;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "POLICYGUARD_CONFIG";

const LOCAL_CONFIG: &str = "policyguard.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Resolve the config file. An explicit path must load; the fallbacks
    /// only warn and move on.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "POLICYGUARD_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(error = %e, "local config file could not be loaded, using defaults");
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated processing latency for "submit normal".
    pub normal_latency_ms: u64,
    /// Simulated processing latency for "inject outlier".
    pub outlier_latency_ms: u64,
    /// Chance that an injected outlier lands in the breach regime.
    pub breach_probability: f64,
    /// Maximum entries kept in the security console.
    pub log_capacity: usize,
    /// Initial state of the server-side validation toggle.
    pub validation_enabled: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            normal_latency_ms: 1500,
            outlier_latency_ms: 2000,
            breach_probability: 0.2,
            log_capacity: DEFAULT_LOG_CAPACITY,
            validation_enabled: false,
        }
    }
}

impl SimulationConfig {
    /// Same settings with both latencies set to zero.
    pub fn without_latency(mut self) -> Self {
        self.normal_latency_ms = 0;
        self.outlier_latency_ms = 0;
        self
    }

    pub fn latency_for(&self, action: Action) -> Duration {
        match action {
            Action::SubmitNormal => Duration::from_millis(self.normal_latency_ms),
            Action::InjectOutlier => Duration::from_millis(self.outlier_latency_ms),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.breach_probability) {
            bail!(
                "simulation.breach_probability must be within [0, 1], got {}",
                self.breach_probability
            );
        }
        if self.log_capacity == 0 {
            bail!("simulation.log_capacity must be at least 1");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
