use anyhow::{Context, Result};
use facematch_core::Gallery;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One labeled sample in a gallery input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub name: String,
    pub embedding: Vec<f32>,
}

pub fn parse_records(raw: &str) -> Result<Vec<GalleryRecord>> {
    Ok(serde_json::from_str(raw)?)
}

pub fn load_records(path: &Path) -> Result<Vec<GalleryRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading gallery {}", path.display()))?;
    parse_records(&raw).with_context(|| format!("parsing gallery {}", path.display()))
}

/// Read a single embedding stored as a JSON array of numbers.
pub fn load_vector(path: &Path) -> Result<Vec<f32>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Build a gallery, standardizing each embedding first when asked.
pub fn build_gallery(
    mut records: Vec<GalleryRecord>,
    embedding_dim: usize,
    standardize: bool,
) -> Result<Gallery> {
    if standardize {
        for r in records.iter_mut() {
            facematch_core::embedding::standardize(&mut r.embedding)
                .with_context(|| format!("standardizing sample of '{}'", r.name))?;
        }
    }
    let pairs: Vec<(String, Vec<f32>)> = records
        .into_iter()
        .map(|r| (r.name, r.embedding))
        .collect();
    Ok(Gallery::from_pairs(&pairs, embedding_dim)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"[
        {"name": "alice", "embedding": [1.0, 0.0, 0.5]},
        {"name": "bob",   "embedding": [0.0, 1.0, 0.5]},
        {"name": "alice", "embedding": [0.9, 0.1, 0.4]}
    ]"#;

    #[test]
    fn test_parse_and_build() -> Result<()> {
        let records = parse_records(DOC)?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].name, "bob");

        let gallery = build_gallery(records, 3, false)?;
        assert_eq!(gallery.sample_count("alice"), 2);
        assert_eq!(gallery.embedding(0).to_vec(), vec![1.0, 0.0, 0.5]);
        Ok(())
    }

    #[test]
    fn test_build_standardized() -> Result<()> {
        let gallery = build_gallery(parse_records(DOC)?, 3, true)?;
        let mean: f32 = gallery.embedding(1).sum() / 3.0;
        assert!(mean.abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_wrong_dimension() -> Result<()> {
        let err = build_gallery(parse_records(DOC)?, 4, false).unwrap_err();
        assert!(err.to_string().contains("expected 4 values"));
        Ok(())
    }

    #[test]
    fn test_malformed() {
        assert!(parse_records(r#"[{"name": "x"}]"#).is_err());
    }
}
