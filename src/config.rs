use anyhow::{Context, Result};
use facematch_core::{MatcherConfig, Metric, ModelKind};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEMATCH_CONFIG_PATH").unwrap_or("/usr/local/etc/facematch/config.toml"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelKind,
    pub metric: Metric,
    /// Overrides the model preset's threshold for `metric`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    /// Overrides the model preset's output size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dim: Option<usize>,
    pub standardize: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelKind::Facenet,
            metric: Metric::Cosine,
            threshold: None,
            embedding_dim: None,
            standardize: false,
        }
    }
}

impl Config {
    pub fn matcher_config(&self) -> MatcherConfig {
        let info = self.model.info();
        MatcherConfig {
            embedding_dim: self.embedding_dim.unwrap_or(info.output_dims),
            metric: self.metric,
            threshold: self.threshold.unwrap_or_else(|| info.threshold(self.metric)),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

/// Write the default config when none exists yet. Returns true if a file
/// was created.
pub fn ensure_config(path: Option<&Path>) -> Result<bool> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("writing default config to {}", path.display()))?;
    Ok(true)
}
