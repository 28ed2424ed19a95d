//! Scripted anomaly-detection narrative for the security tester.
//!
//! The [`driver::SimulationDriver`] turns a tester action into a sample from
//! one of three [`regime::Regime`]s after an artificial delay and pushes it
//! into the shared store.

pub mod driver;
pub mod inputs;
pub mod log;
pub mod regime;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::driver::{SimulationDriver, SimulationOutcome};
pub use self::regime::{RandomSampler, Regime, RegimeSampler};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("a submission is already being processed")]
    Busy,
    #[error("submission task failed: {0}")]
    Task(String),
}

/// Tester buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SubmitNormal,
    InjectOutlier,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SubmitNormal => f.pad("normal"),
            Action::InjectOutlier => f.pad("outlier"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "submit_normal" => Ok(Action::SubmitNormal),
            "outlier" | "inject_outlier" => Ok(Action::InjectOutlier),
            other => Err(format!("unknown action '{}', expected 'normal' or 'outlier'", other)),
        }
    }
}
