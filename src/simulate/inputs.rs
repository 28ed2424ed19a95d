//! Tracked economic form inputs and the simulated tamper check.

use serde::{Deserialize, Serialize};

/// The four economic figures entered in the tester form.
///
/// Values are kept as the raw strings the user typed. They are compared
/// byte-for-byte by the tamper check and only parsed for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInputs {
    pub tax_rate: String,
    pub gdp_growth: String,
    pub inflation: String,
    pub unemployment: String,
}

impl Default for FormInputs {
    fn default() -> Self {
        Self {
            tax_rate: "15".to_string(),
            gdp_growth: "5.2".to_string(),
            inflation: "3.5".to_string(),
            unemployment: "4.1".to_string(),
        }
    }
}

impl FormInputs {
    /// `(label, raw value)` pairs in form order.
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("Tax Rate", self.tax_rate.as_str()),
            ("GDP Growth", self.gdp_growth.as_str()),
            ("Inflation", self.inflation.as_str()),
            ("Unemployment", self.unemployment.as_str()),
        ]
    }

    /// Labels of fields that do not parse as a finite number.
    pub fn non_numeric_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, raw)| raw.trim().parse::<f64>().map_or(true, |v| !v.is_finite()))
            .map(|(label, _)| label)
            .collect()
    }

    /// Compare against a previously stored copy.
    pub fn check_against(&self, stored: Option<&FormInputs>) -> TamperCheck {
        let Some(stored) = stored else {
            return TamperCheck::NoSnapshot;
        };

        let changed: Vec<String> = self
            .fields()
            .into_iter()
            .zip(stored.fields())
            .filter(|((_, now), (_, then))| now.as_bytes() != then.as_bytes())
            .map(|((label, _), _)| label.to_string())
            .collect();

        if changed.is_empty() {
            TamperCheck::Passed
        } else {
            TamperCheck::Tampered { changed }
        }
    }
}

/// Result of the simulated server-side validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TamperCheck {
    /// Validation toggle is off.
    Disabled,
    /// Validation is on but no inputs were stored to compare against.
    NoSnapshot,
    Passed,
    Tampered { changed: Vec<String> },
}

impl TamperCheck {
    pub fn is_tampered(&self) -> bool {
        matches!(self, TamperCheck::Tampered { .. })
    }
}
