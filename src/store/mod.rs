//! Reactive state behind the security dashboard.
//!
//! [`SecurityDataStore`] owns the anomaly and confidence series plus the
//! per-feature anomaly scores. Every mutation bumps the store revision and
//! publishes a [`StoreEvent`] to subscribers before returning.

pub mod features;
pub mod window;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use self::features::{FeatureAnomalyEntry, FeatureAnomalyMap, Upsert};
use self::window::SlidingWindow;

/// Display value used for the `normal`/`poisoned` lines when a score falls
/// outside the band that line tracks.
pub const BASELINE: f64 = 0.25;

/// Scores below this are plotted as-is on both lines.
pub const NORMAL_CEILING: f64 = 0.3;

/// Scores above this are plotted as-is on the `poisoned` line.
pub const POISON_FLOOR: f64 = 0.5;

const EVENT_BUFFER: usize = 64;

/// Store shared between the HTTP handlers and the simulation driver.
pub type SharedStore = Arc<RwLock<SecurityDataStore>>;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// A single observation submitted to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesSample {
    time: String,
    score: f64,
    confidence: f64,
}

impl TimeSeriesSample {
    /// Build a sample. `score` and `confidence` must be finite; their range is
    /// not checked.
    pub fn new(time: impl Into<String>, score: f64, confidence: f64) -> Result<Self, StoreError> {
        if !score.is_finite() {
            return Err(StoreError::NonFinite { field: "score", value: score });
        }
        if !confidence.is_finite() {
            return Err(StoreError::NonFinite {
                field: "confidence",
                value: confidence,
            });
        }
        Ok(Self {
            time: time.into(),
            score,
            confidence,
        })
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// A stored point, including the derived values the charts plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: String,
    pub score: f64,
    pub confidence: f64,
    pub normal: f64,
    pub poisoned: f64,
}

impl SeriesPoint {
    /// Point for the anomaly series: derived lines follow the score.
    pub fn anomaly(sample: &TimeSeriesSample) -> Self {
        Self {
            time: sample.time.clone(),
            score: sample.score,
            confidence: sample.confidence,
            normal: normal_line(sample.score),
            poisoned: poisoned_line(sample.score),
        }
    }

    /// Point for the confidence series: both derived lines carry the confidence.
    pub fn confidence(sample: &TimeSeriesSample) -> Self {
        Self {
            time: sample.time.clone(),
            score: sample.score,
            confidence: sample.confidence,
            normal: sample.confidence,
            poisoned: sample.confidence,
        }
    }
}

/// `normal` line value for a score. The mid band [0.3, 0.5] is flattened to
/// the baseline on purpose.
pub fn normal_line(score: f64) -> f64 {
    if score < NORMAL_CEILING {
        score
    } else {
        BASELINE
    }
}

/// `poisoned` line value for a score.
pub fn poisoned_line(score: f64) -> f64 {
    if score > POISON_FLOOR || score < NORMAL_CEILING {
        score
    } else {
        BASELINE
    }
}

const SEED_POINTS: [(&str, f64, f64); 5] = [
    ("Day 1", 0.2, 0.95),
    ("Day 2", 0.21, 0.94),
    ("Day 3", 0.22, 0.95),
    ("Day 4", 0.2, 0.94),
    ("Day 5", 0.19, 0.96),
];

const SEED_FEATURES: [(&str, f64); 5] = [
    ("Tax Rate", 0.2),
    ("GDP Growth", 0.3),
    ("Inflation", 0.2),
    ("Unemployment", 0.2),
    ("Investment", 0.3),
];

/// Seed points as stored in both series: the derived lines equal the score.
pub fn seed_series() -> Vec<SeriesPoint> {
    SEED_POINTS
        .iter()
        .map(|&(time, score, confidence)| SeriesPoint {
            time: time.to_string(),
            score,
            confidence,
            normal: score,
            poisoned: score,
        })
        .collect()
}

pub fn seed_features() -> FeatureAnomalyMap {
    FeatureAnomalyMap::from_entries(
        SEED_FEATURES
            .iter()
            .map(|&(feature, score)| FeatureAnomalyEntry::new(feature, score)),
    )
}

/// Change notification published on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    DataPointAdded {
        revision: u64,
        point: SeriesPoint,
    },
    AnomalousInputUpdated {
        revision: u64,
        feature: String,
        score: f64,
        inserted: bool,
    },
    Reset {
        revision: u64,
    },
}

impl StoreEvent {
    pub fn revision(&self) -> u64 {
        match self {
            StoreEvent::DataPointAdded { revision, .. }
            | StoreEvent::AnomalousInputUpdated { revision, .. }
            | StoreEvent::Reset { revision } => *revision,
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            StoreEvent::DataPointAdded { .. } => "data_point_added",
            StoreEvent::AnomalousInputUpdated { .. } => "anomalous_input_updated",
            StoreEvent::Reset { .. } => "reset",
        }
    }
}

/// Read-only copy of the store handed to views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub revision: u64,
    pub anomaly_series: Vec<SeriesPoint>,
    pub confidence_series: Vec<SeriesPoint>,
    pub anomalous_inputs: Vec<FeatureAnomalyEntry>,
}

/// Owner of the dashboard series and feature scores.
pub struct SecurityDataStore {
    anomaly_series: SlidingWindow<SeriesPoint>,
    confidence_series: SlidingWindow<SeriesPoint>,
    anomalous_inputs: FeatureAnomalyMap,
    revision: u64,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for SecurityDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityDataStore {
    /// Create a store holding the seed data.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            anomaly_series: SlidingWindow::from_seed(seed_series()),
            confidence_series: SlidingWindow::from_seed(seed_series()),
            anomalous_inputs: seed_features(),
            revision: 0,
            events,
        }
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Receive every subsequent [`StoreEvent`].
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn anomaly_series(&self) -> &SlidingWindow<SeriesPoint> {
        &self.anomaly_series
    }

    pub fn confidence_series(&self) -> &SlidingWindow<SeriesPoint> {
        &self.confidence_series
    }

    pub fn anomalous_inputs(&self) -> &FeatureAnomalyMap {
        &self.anomalous_inputs
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            revision: self.revision,
            anomaly_series: self.anomaly_series.to_vec(),
            confidence_series: self.confidence_series.to_vec(),
            anomalous_inputs: self.anomalous_inputs.as_slice().to_vec(),
        }
    }

    /// Push `sample` onto both series, evicting their oldest points.
    pub fn add_data_point(&mut self, sample: &TimeSeriesSample) {
        let point = SeriesPoint::anomaly(sample);
        self.anomaly_series.push(point.clone());
        self.confidence_series.push(SeriesPoint::confidence(sample));

        debug!(
            time = %sample.time,
            score = sample.score,
            confidence = sample.confidence,
            normal = point.normal,
            poisoned = point.poisoned,
            "data point added"
        );

        let revision = self.bump();
        self.publish(StoreEvent::DataPointAdded { revision, point });
    }

    /// Set the score for `feature`, appending it if unseen.
    pub fn update_anomalous_inputs(&mut self, feature: &str, score: f64) {
        let inserted = matches!(self.anomalous_inputs.upsert(feature, score), Upsert::Inserted);
        debug!(feature, score, inserted, "anomalous input updated");

        let revision = self.bump();
        self.publish(StoreEvent::AnomalousInputUpdated {
            revision,
            feature: feature.to_string(),
            score,
            inserted,
        });
    }

    /// Restore the seed series and feature scores.
    pub fn reset_data(&mut self) {
        self.anomaly_series = SlidingWindow::from_seed(seed_series());
        self.confidence_series = SlidingWindow::from_seed(seed_series());
        self.anomalous_inputs = seed_features();
        debug!("security data reset to seed");

        let revision = self.bump();
        self.publish(StoreEvent::Reset { revision });
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn publish(&self, event: StoreEvent) {
        // No receivers is fine; views may not be connected yet.
        let _ = self.events.send(event);
    }
}
