//! Severity regimes and the random sampler that stands in for a detector.

use std::fmt;
use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::simulate::log::LogSeverity;
use crate::store::TimeSeriesSample;

/// Feature scores written for the anomaly regime.
const ANOMALY_FEATURES: [(&str, f64); 4] = [
    ("Tax Rate", 0.35),
    ("GDP Growth", 0.8),
    ("Inflation", 0.75),
    ("Unemployment", 0.4),
];

/// Feature scores written for the breach regime.
const BREACH_FEATURES: [(&str, f64); 4] = [
    ("Tax Rate", 0.7),
    ("GDP Growth", 0.95),
    ("Inflation", 0.9),
    ("Unemployment", 0.85),
];

/// Severity profile a simulated submission lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Normal,
    Anomaly,
    Breach,
}

impl Regime {
    /// Half-open band the anomaly score is drawn from.
    pub fn score_band(self) -> Range<f64> {
        match self {
            Regime::Normal => 0.20..0.25,
            Regime::Anomaly => 0.60..0.80,
            Regime::Breach => 0.85..0.95,
        }
    }

    /// Half-open band the model confidence is drawn from.
    pub fn confidence_band(self) -> Range<f64> {
        match self {
            Regime::Normal => 0.92..0.97,
            Regime::Anomaly => 0.40..0.60,
            Regime::Breach => 0.20..0.40,
        }
    }

    /// Fixed per-feature scores pushed to the store. Empty for `Normal`.
    pub fn feature_scores(self) -> &'static [(&'static str, f64)] {
        match self {
            Regime::Normal => &[],
            Regime::Anomaly => &ANOMALY_FEATURES,
            Regime::Breach => &BREACH_FEATURES,
        }
    }

    pub fn severity(self) -> LogSeverity {
        match self {
            Regime::Normal => LogSeverity::Success,
            Regime::Anomaly => LogSeverity::Warning,
            Regime::Breach => LogSeverity::Error,
        }
    }

    /// Log line shown in the security console.
    pub fn message(self) -> &'static str {
        match self {
            Regime::Normal => "Normal input processed successfully. No anomalies detected.",
            Regime::Anomaly => {
                "Anomaly detected! Potential attack prevented. Unusual patterns in GDP growth and inflation."
            }
            Regime::Breach => {
                "Critical breach attempt! Outlier values have affected model predictions."
            }
        }
    }

    /// Short notification title.
    pub fn headline(self) -> &'static str {
        match self {
            Regime::Normal => "Success",
            Regime::Anomaly => "Warning",
            Regime::Breach => "Critical Error",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Normal => f.pad("normal"),
            Regime::Anomaly => f.pad("anomaly"),
            Regime::Breach => f.pad("breach"),
        }
    }
}

/// Bernoulli draw for the "inject outlier" action.
pub fn select_outlier_regime<R: Rng + ?Sized>(rng: &mut R, breach_probability: f64) -> Regime {
    if rng.gen_bool(breach_probability) {
        Regime::Breach
    } else {
        Regime::Anomaly
    }
}

/// Produces a sample for a regime.
///
/// The random implementation below is a stand-in; a real scoring model can
/// implement this without touching the store or the HTTP layer.
pub trait RegimeSampler: Send {
    fn sample_regime(&mut self, regime: Regime) -> TimeSeriesSample;
}

/// Draws uniformly inside each regime's bands and stamps the local wall time.
pub struct RandomSampler<R> {
    rng: R,
}

impl<R: Rng + Send> RandomSampler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> RegimeSampler for RandomSampler<R> {
    fn sample_regime(&mut self, regime: Regime) -> TimeSeriesSample {
        let score = self.rng.gen_range(regime.score_band());
        let confidence = self.rng.gen_range(regime.confidence_band());
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        TimeSeriesSample::new(time, score, confidence)
            .expect("regime bands are finite")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_samples_stay_inside_bands() {
        let mut sampler = RandomSampler::new(StdRng::seed_from_u64(7));
        for regime in [Regime::Normal, Regime::Anomaly, Regime::Breach] {
            for _ in 0..500 {
                let s = sampler.sample_regime(regime);
                assert!(
                    regime.score_band().contains(&s.score()),
                    "{} score {} outside band",
                    regime,
                    s.score()
                );
                assert!(
                    regime.confidence_band().contains(&s.confidence()),
                    "{} confidence {} outside band",
                    regime,
                    s.confidence()
                );
            }
        }
    }

    #[test]
    fn test_outlier_split_is_roughly_80_20() {
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 1000;
        let anomalies = (0..trials)
            .filter(|_| select_outlier_regime(&mut rng, 0.2) == Regime::Anomaly)
            .count();

        // Binomial(1000, 0.8): sd ~12.6, allow a little over 3 sd.
        assert!(
            (760..=840).contains(&anomalies),
            "anomaly share {} out of {}",
            anomalies,
            trials
        );
    }

    #[test]
    fn test_degenerate_probabilities() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_outlier_regime(&mut rng, 0.0), Regime::Anomaly);
        assert_eq!(select_outlier_regime(&mut rng, 1.0), Regime::Breach);
    }

    #[test]
    fn test_normal_regime_writes_no_features() {
        assert!(Regime::Normal.feature_scores().is_empty());
        assert_eq!(Regime::Anomaly.feature_scores().len(), 4);
        assert_eq!(Regime::Breach.feature_scores().len(), 4);
    }
}
