//! Drives the security tester: delay, regime choice, sampling, store update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::SimulationConfig;
use crate::simulate::inputs::{FormInputs, TamperCheck};
use crate::simulate::log::{LogEntry, LogSeverity, SecurityLog};
use crate::simulate::regime::{select_outlier_regime, RandomSampler, Regime, RegimeSampler};
use crate::simulate::{Action, DriverError};
use crate::store::{SharedStore, TimeSeriesSample};

/// What one submission produced, for the caller's notification.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub action: Action,
    pub regime: Regime,
    pub headline: &'static str,
    pub sample: TimeSeriesSample,
    pub tamper_check: TamperCheck,
    pub log_entry: LogEntry,
    /// Store revision after the update was applied.
    pub revision: u64,
}

struct DriverState {
    inputs: FormInputs,
    stored_inputs: Option<FormInputs>,
    validation_enabled: bool,
    log: SecurityLog,
    sampler: Box<dyn RegimeSampler>,
    selector: StdRng,
}

/// Turns tester actions into store updates.
///
/// Only one submission may be pending at a time; a second one is rejected
/// with [`DriverError::Busy`] rather than queued. Once triggered, a
/// submission runs to completion even if the caller stops waiting.
pub struct SimulationDriver {
    store: SharedStore,
    settings: SimulationConfig,
    state: Mutex<DriverState>,
    pending: AtomicBool,
}

/// Clears the pending flag when the submission task ends.
struct PendingGuard(Arc<SimulationDriver>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.pending.store(false, Ordering::Release);
    }
}

impl SimulationDriver {
    pub fn new(store: SharedStore, settings: SimulationConfig) -> Self {
        Self::with_sampler(
            store,
            settings,
            Box::new(RandomSampler::new(StdRng::from_entropy())),
            StdRng::from_entropy(),
        )
    }

    /// Deterministic driver for tests and reproducible CLI runs.
    pub fn with_seed(store: SharedStore, settings: SimulationConfig, seed: u64) -> Self {
        Self::with_sampler(
            store,
            settings,
            Box::new(RandomSampler::new(StdRng::seed_from_u64(seed))),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    pub fn with_sampler(
        store: SharedStore,
        mut settings: SimulationConfig,
        sampler: Box<dyn RegimeSampler>,
        selector: StdRng,
    ) -> Self {
        if let Err(e) = settings.validate() {
            warn!(error = %e, "invalid simulation settings, using defaults");
            settings = SimulationConfig::default();
        }

        let state = DriverState {
            inputs: FormInputs::default(),
            stored_inputs: None,
            validation_enabled: settings.validation_enabled,
            log: SecurityLog::new(settings.log_capacity),
            sampler,
            selector,
        };

        Self {
            store,
            settings,
            state: Mutex::new(state),
            pending: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &SimulationConfig {
        &self.settings
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub async fn inputs(&self) -> FormInputs {
        self.state.lock().await.inputs.clone()
    }

    pub async fn set_inputs(&self, inputs: FormInputs) {
        self.state.lock().await.inputs = inputs;
    }

    /// Remember the current inputs for later tamper checks.
    pub async fn store_inputs(&self) -> FormInputs {
        let mut state = self.state.lock().await;
        let snapshot = state.inputs.clone();
        state.stored_inputs = Some(snapshot.clone());
        state
            .log
            .push(LogSeverity::Success, "Input values stored for server-side validation.");
        info!(?snapshot, "stored inputs for validation");
        snapshot
    }

    pub async fn stored_inputs(&self) -> Option<FormInputs> {
        self.state.lock().await.stored_inputs.clone()
    }

    pub async fn set_validation(&self, enabled: bool) {
        self.state.lock().await.validation_enabled = enabled;
        info!(enabled, "server-side validation toggled");
    }

    pub async fn validation_enabled(&self) -> bool {
        self.state.lock().await.validation_enabled
    }

    /// Console entries, newest first.
    pub async fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().await.log.entries()
    }

    pub async fn clear_logs(&self) {
        self.state.lock().await.log.clear();
    }

    /// Run one tester action: wait the simulated latency, then apply it.
    ///
    /// The work runs on its own task, so dropping the returned future does
    /// not cancel a submission that was already accepted.
    pub async fn submit(self: &Arc<Self>, action: Action) -> Result<SimulationOutcome, DriverError> {
        if self.pending.swap(true, Ordering::AcqRel) {
            warn!(%action, "submission rejected, another one is pending");
            return Err(DriverError::Busy);
        }
        let guard = PendingGuard(Arc::clone(self));

        let task = tokio::spawn(async move {
            let driver = &guard.0;
            let latency = driver.settings.latency_for(action);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            driver.apply(action).await
        });

        task.await.map_err(|e| {
            error!(%action, error = %e, "submission task failed");
            DriverError::Task(e.to_string())
        })
    }

    async fn apply(&self, action: Action) -> SimulationOutcome {
        let mut state = self.state.lock().await;
        let state = &mut *state;

        let [tax_rate, gdp_growth, inflation, unemployment] = state.inputs.fields().map(|(_, v)| v);
        info!(%action, tax_rate, gdp_growth, inflation, unemployment, "processing submission");

        let non_numeric = state.inputs.non_numeric_fields();
        if !non_numeric.is_empty() {
            state.log.push(
                LogSeverity::Warning,
                format!("Non-numeric values entered for: {}.", non_numeric.join(", ")),
            );
        }

        let tamper_check = if state.validation_enabled {
            state.inputs.check_against(state.stored_inputs.as_ref())
        } else {
            TamperCheck::Disabled
        };

        let regime = match (&tamper_check, action) {
            (TamperCheck::Tampered { .. }, _) => Regime::Breach,
            (_, Action::SubmitNormal) => Regime::Normal,
            (_, Action::InjectOutlier) => {
                select_outlier_regime(&mut state.selector, self.settings.breach_probability)
            }
        };

        let sample = state.sampler.sample_regime(regime);

        let log_entry = match &tamper_check {
            TamperCheck::Tampered { changed } => {
                warn!(?changed, "tamper check failed, forcing breach");
                state.log.push(
                    LogSeverity::Error,
                    format!(
                        "Tamper detected! Inputs changed since validation snapshot: {}. Submission treated as a breach.",
                        changed.join(", ")
                    ),
                )
            }
            _ => state.log.push(regime.severity(), regime.message()),
        };

        let revision = {
            let mut store = self.store.write().await;
            store.add_data_point(&sample);
            for (feature, score) in regime.feature_scores() {
                store.update_anomalous_inputs(feature, *score);
            }
            store.revision()
        };

        info!(
            %action,
            %regime,
            score = sample.score(),
            confidence = sample.confidence(),
            revision,
            "simulation applied"
        );

        SimulationOutcome {
            action,
            regime,
            headline: if tamper_check.is_tampered() {
                "Tamper Detected"
            } else {
                regime.headline()
            },
            sample,
            tamper_check,
            log_entry,
            revision,
        }
    }
}
