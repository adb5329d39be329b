use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::embedding::dot;
use crate::error::MatchError;

/// Similarity mode, fixed when a matcher is built.
///
/// Both variants produce "higher is better" scores so one threshold rule
/// (`score >= threshold`) serves either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity, in [-1, 1].
    #[default]
    Cosine,
    /// Negated Euclidean distance, in (-inf, 0]. The reference matcher's
    /// "L2" scorer computed the cosine formula; this one is a real distance.
    L2,
}

impl Metric {
    /// Score `probe` against one gallery row. `probe_mag` and `entry_mag`
    /// are the precomputed magnitudes; only cosine reads them. Computed in
    /// f64, which holds any product of two finite f32 values.
    pub fn score(
        self,
        probe: ArrayView1<f32>,
        probe_mag: f64,
        entry: ArrayView1<f32>,
        entry_mag: f64,
    ) -> f64 {
        match self {
            Metric::Cosine => dot(probe, entry) / (probe_mag * entry_mag),
            Metric::L2 => {
                let sq: f64 = probe
                    .iter()
                    .zip(entry.iter())
                    .map(|(&p, &g)| {
                        let d = f64::from(p) - f64::from(g);
                        d * d
                    })
                    .sum();
                -sq.sqrt()
            }
        }
    }

    /// Whether this mode divides by vector magnitudes.
    pub fn needs_direction(self) -> bool {
        matches!(self, Metric::Cosine)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::L2 => "l2",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "l2" => Ok(Metric::L2),
            other => Err(MatchError::Configuration(format!(
                "unknown metric '{}', expected 'cosine' or 'l2'",
                other
            ))),
        }
    }
}
