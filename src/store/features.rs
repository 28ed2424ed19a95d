//! Per-feature anomaly scores, keyed by feature name in first-seen order.

use serde::{Deserialize, Serialize};

/// One feature and its current anomaly score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnomalyEntry {
    pub feature: String,
    pub score: f64,
}

impl FeatureAnomalyEntry {
    pub fn new(feature: impl Into<String>, score: f64) -> Self {
        Self {
            feature: feature.into(),
            score,
        }
    }
}

/// What an [`FeatureAnomalyMap::upsert`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upsert {
    Inserted,
    Updated { previous: f64 },
}

/// Insertion-ordered map of feature name to score.
///
/// Feature names are unique. Updates replace the score in place; new
/// features are appended. There is no removal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureAnomalyMap {
    entries: Vec<FeatureAnomalyEntry>,
}

impl FeatureAnomalyMap {
    pub fn from_entries(entries: impl IntoIterator<Item = FeatureAnomalyEntry>) -> Self {
        let mut map = Self::default();
        for entry in entries {
            map.upsert(&entry.feature, entry.score);
        }
        map
    }

    pub fn upsert(&mut self, feature: &str, score: f64) -> Upsert {
        match self.entries.iter_mut().find(|e| e.feature == feature) {
            Some(entry) => {
                let previous = entry.score;
                entry.score = score;
                Upsert::Updated { previous }
            }
            None => {
                self.entries.push(FeatureAnomalyEntry::new(feature, score));
                Upsert::Inserted
            }
        }
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.feature == feature)
            .map(|e| e.score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[FeatureAnomalyEntry] {
        &self.entries
    }
}
