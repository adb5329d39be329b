use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// Embedding producers the matcher is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    #[default]
    Facenet,
    #[serde(rename = "facenet-512")]
    Facenet512,
}

/// Output size and acceptance thresholds of an embedding model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub output_dims: usize,
    /// Square input size in pixels, informational only.
    pub input_dims: u32,
    pub cosine_threshold: f32,
    /// Maximum accepted Euclidean distance.
    pub l2_threshold: f32,
}

pub const FACENET: ModelInfo = ModelInfo {
    name: "FaceNet",
    output_dims: 128,
    input_dims: 160,
    cosine_threshold: 0.4,
    l2_threshold: 10.0,
};

pub const FACENET_512: ModelInfo = ModelInfo {
    name: "FaceNet-512",
    output_dims: 512,
    input_dims: 160,
    cosine_threshold: 0.3,
    l2_threshold: 23.56,
};

pub const MODELS: [ModelInfo; 2] = [FACENET, FACENET_512];

impl ModelKind {
    pub fn info(self) -> &'static ModelInfo {
        match self {
            ModelKind::Facenet => &FACENET,
            ModelKind::Facenet512 => &FACENET_512,
        }
    }
}

impl ModelInfo {
    /// Threshold in score space for `metric`. L2 scores are negated
    /// distances, so the distance limit flips sign.
    pub fn threshold(&self, metric: Metric) -> f32 {
        match metric {
            Metric::Cosine => self.cosine_threshold,
            Metric::L2 => -self.l2_threshold,
        }
    }
}
