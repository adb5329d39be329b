use ndarray::ArrayView1;

use crate::error::{MatchError, Result, Source};

/// Euclidean (L2) magnitude of a vector. Accumulated in f64 so finite f32
/// components can neither overflow to inf nor flush to zero.
pub fn magnitude(v: ArrayView1<f32>) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Dot product with plain sequential accumulation in f64.
pub fn dot(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Check length and finiteness of an embedding against the configured dimension.
pub fn validate(values: &[f32], dim: usize, source_of: Source) -> Result<()> {
    if values.len() != dim {
        return Err(MatchError::DimensionMismatch {
            source_of,
            expected: dim,
            actual: values.len(),
        });
    }
    if let Some(index) = values.iter().position(|x| !x.is_finite()) {
        return Err(MatchError::NonFinite { source_of, index });
    }
    Ok(())
}

/// Scale a vector to unit length in place. Returns false (and leaves the
/// vector untouched) when its norm is zero or not finite.
pub fn l2_normalize(values: &mut [f32]) -> bool {
    let norm = magnitude(ArrayView1::from(&*values));
    if !norm.is_finite() || norm <= 0.0 {
        return false;
    }
    for x in values.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

/// Standardize in place: x' = (x - mean) / std, using the population
/// standard deviation.
pub fn standardize(values: &mut [f32]) -> Result<()> {
    if values.is_empty() {
        return Err(MatchError::DegenerateVector {
            source_of: Source::Input,
            reason: "cannot standardize an empty vector",
        });
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&x| (f64::from(x) - mean) * (f64::from(x) - mean))
        .sum::<f64>()
        / n;
    let std_dev = var.sqrt();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return Err(MatchError::DegenerateVector {
            source_of: Source::Input,
            reason: "zero variance",
        });
    }
    for x in values.iter_mut() {
        *x = ((f64::from(*x) - mean) / std_dev) as f32;
    }
    Ok(())
}
