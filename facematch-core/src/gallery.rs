use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1};

use crate::embedding::{magnitude, validate};
use crate::error::{MatchError, Result, Source};

/// Labeled reference embeddings, stored row-major in one arena.
#[derive(Debug, Clone)]
pub struct Gallery {
    names: Vec<String>,
    vectors: Array2<f32>,
    magnitudes: Array1<f64>,
    sample_counts: BTreeMap<String, usize>,
}

impl Gallery {
    /// Build a gallery from parallel name / embedding lists.
    pub fn new<S, E>(names: &[S], embeddings: &[E], embedding_dim: usize) -> Result<Self>
    where
        S: AsRef<str>,
        E: AsRef<[f32]>,
    {
        if embedding_dim == 0 {
            return Err(MatchError::Configuration(
                "embedding dimension must be positive".into(),
            ));
        }
        if names.len() != embeddings.len() {
            return Err(MatchError::Configuration(format!(
                "got {} names but {} embeddings",
                names.len(),
                embeddings.len()
            )));
        }

        let count = embeddings.len();
        let mut flat = Vec::with_capacity(count * embedding_dim);
        for (i, e) in embeddings.iter().enumerate() {
            let e = e.as_ref();
            validate(e, embedding_dim, Source::Gallery(i))?;
            flat.extend_from_slice(e);
        }
        let vectors = Array2::from_shape_vec((count, embedding_dim), flat)
            .map_err(|e| MatchError::Configuration(e.to_string()))?;

        let magnitudes: Array1<f64> = vectors.rows().into_iter().map(magnitude).collect();

        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_owned()).collect();
        let mut sample_counts = BTreeMap::new();
        for name in &names {
            *sample_counts.entry(name.clone()).or_insert(0) += 1;
        }

        Ok(Self {
            names,
            vectors,
            magnitudes,
            sample_counts,
        })
    }

    /// Build a gallery from (name, embedding) pairs.
    pub fn from_pairs<S, E>(pairs: &[(S, E)], embedding_dim: usize) -> Result<Self>
    where
        S: AsRef<str>,
        E: AsRef<[f32]>,
    {
        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_ref()).collect();
        let embeddings: Vec<&[f32]> = pairs.iter().map(|(_, e)| e.as_ref()).collect();
        Self::new(&names, &embeddings, embedding_dim)
    }

    pub fn embedding_dim(&self) -> usize {
        self.vectors.ncols()
    }

    /// Number of entries (samples), not subjects.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn embedding(&self, index: usize) -> ArrayView1<'_, f32> {
        self.vectors.row(index)
    }

    pub fn magnitude(&self, index: usize) -> f64 {
        self.magnitudes[index]
    }

    /// Number of samples stored for `name`, 0 if unknown.
    pub fn sample_count(&self, name: &str) -> usize {
        self.sample_counts.get(name).copied().unwrap_or(0)
    }

    /// Distinct subjects with their sample counts, in byte order of name.
    pub fn subjects(&self) -> impl Iterator<Item = (&str, usize)> {
        self.sample_counts.iter().map(|(n, c)| (n.as_str(), *c))
    }

    pub fn subject_count(&self) -> usize {
        self.sample_counts.len()
    }

    /// Index of the first entry whose magnitude is zero or not finite.
    pub(crate) fn first_degenerate_magnitude(&self) -> Option<usize> {
        self.magnitudes
            .iter()
            .position(|m| *m == 0.0 || !m.is_finite())
    }

    /// Iterate entries as (name, embedding, cached magnitude).
    pub fn entries(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, f32>, f64)> {
        self.names
            .iter()
            .zip(self.vectors.rows())
            .zip(self.magnitudes.iter())
            .map(|((n, v), m)| (n.as_str(), v, *m))
    }
}
