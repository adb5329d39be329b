use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace, warn};
use ndarray::ArrayView1;

use crate::embedding::{magnitude, validate};
use crate::error::{MatchError, Result, Source};
use crate::gallery::Gallery;
use crate::metric::Metric;

/// Label rendered for a rejected probe.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    pub embedding_dim: usize,
    pub metric: Metric,
    pub threshold: f32,
}

/// Verdict of one `identify` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Known(String),
    Unknown,
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Known(name) => name,
            Label::Unknown => UNKNOWN_LABEL,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Label::Known(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean score of one subject for one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectScore {
    pub name: String,
    pub score: f32,
    pub samples: usize,
}

/// Nearest-identity classifier over a fixed gallery.
///
/// Holds no mutable state, so one instance can serve concurrent queries.
#[derive(Debug, Clone)]
pub struct IdentityMatcher {
    gallery: Gallery,
    metric: Metric,
    threshold: f32,
}

impl IdentityMatcher {
    pub fn new<S, E>(names: &[S], embeddings: &[E], config: MatcherConfig) -> Result<Self>
    where
        S: AsRef<str>,
        E: AsRef<[f32]>,
    {
        let gallery = Gallery::new(names, embeddings, config.embedding_dim)?;
        Self::with_gallery(gallery, config.metric, config.threshold)
    }

    pub fn with_gallery(gallery: Gallery, metric: Metric, threshold: f32) -> Result<Self> {
        if threshold.is_nan() {
            return Err(MatchError::Configuration("threshold is NaN".into()));
        }
        if metric.needs_direction() {
            if let Some(i) = gallery.first_degenerate_magnitude() {
                return Err(MatchError::DegenerateVector {
                    source_of: Source::Gallery(i),
                    reason: "magnitude is zero or not finite, no direction for cosine similarity",
                });
            }
        }
        if gallery.is_empty() {
            warn!("identity matcher built with an empty gallery, every probe will be unknown");
        }
        debug!(
            "identity matcher ready: {} entries, {} subjects, dim {}, metric {}, threshold {:.3}",
            gallery.len(),
            gallery.subject_count(),
            gallery.embedding_dim(),
            metric,
            threshold
        );
        Ok(Self {
            gallery,
            metric,
            threshold,
        })
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn embedding_dim(&self) -> usize {
        self.gallery.embedding_dim()
    }

    /// Classify `probe` as a gallery subject or `Label::Unknown`.
    pub fn identify(&self, probe: &[f32]) -> Result<Label> {
        self.identify_with_score(probe).map(|(label, _)| label)
    }

    /// Like `identify`, also returning the best subject's mean score
    /// (`None` for an empty gallery).
    pub fn identify_with_score(&self, probe: &[f32]) -> Result<(Label, Option<f32>)> {
        let ranked = self.rank(probe)?;
        Ok(self.decide(&ranked))
    }

    /// Apply the threshold to the head of a `rank` result.
    pub fn decide(&self, ranked: &[SubjectScore]) -> (Label, Option<f32>) {
        let best = ranked.first();
        let label = match best {
            Some(s) if s.score >= self.threshold => Label::Known(s.name.clone()),
            _ => Label::Unknown,
        };
        let score = best.map(|s| s.score);
        trace!("identify -> {} (score {:?})", label, score);
        (label, score)
    }

    /// Mean score of every subject, best first. Equal scores are ordered by
    /// name; NaN scores sort last.
    pub fn rank(&self, probe: &[f32]) -> Result<Vec<SubjectScore>> {
        validate(probe, self.embedding_dim(), Source::Probe)?;
        let probe = ArrayView1::from(probe);
        let probe_mag = magnitude(probe);
        if self.metric.needs_direction() && (probe_mag == 0.0 || !probe_mag.is_finite()) {
            return Err(MatchError::DegenerateVector {
                source_of: Source::Probe,
                reason: "magnitude is zero or not finite, no direction for cosine similarity",
            });
        }

        // per-call accumulator, starts at zero every time
        let mut sums: BTreeMap<&str, f64> = BTreeMap::new();
        for (name, entry, entry_mag) in self.gallery.entries() {
            let score = self.metric.score(probe, probe_mag, entry, entry_mag);
            *sums.entry(name).or_insert(0.0) += score;
        }

        let mut ranked: Vec<SubjectScore> = sums
            .into_iter()
            .map(|(name, sum)| {
                let samples = self.gallery.sample_count(name);
                SubjectScore {
                    name: name.to_owned(),
                    score: (sum / samples as f64) as f32,
                    samples,
                }
            })
            .collect();
        // stable sort keeps byte order of names among equal scores
        ranked.sort_by(|a, b| descending(a.score, b.score));
        Ok(ranked)
    }
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
