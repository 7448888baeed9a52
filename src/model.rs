use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Errors raised while loading a model file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Model file not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Malformed model file: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default = "ModelConfig::default_version")]
    model_version: String,
    #[serde(default)]
    params: ModelParams,
}

impl ModelConfig {
    fn default_version() -> String {
        "0.0.0".to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ModelParams {
    #[serde(default = "ModelParams::default_theta_low")]
    theta_low: f64,
    theta_high: Option<f64>,
}

impl ModelParams {
    fn default_theta_low() -> f64 {
        0.6
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            theta_low: Self::default_theta_low(),
            theta_high: None,
        }
    }
}

/// The identity and decision parameters of one model configuration.
///
/// The identity is content-addressed: it embeds the first seven hex
/// characters of the SHA-256 digest of the model file's raw bytes, so it
/// changes if and only if the file changes byte-for-byte. Every prediction
/// made under a descriptor is stamped with its `identity()`, which makes
/// historical predictions attributable to the exact configuration that
/// produced them even after the model evolves.
///
/// A descriptor is constructed once per run and never mutated.
///
/// # Example
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use thresher::ModelDescriptor;
///
/// let dir = std::env::temp_dir().join("thresher-doc-model");
/// std::fs::create_dir_all(&dir)?;
/// let path = dir.join("model.yaml");
/// std::fs::write(&path, "model_version: \"1.2.0\"\nparams:\n  theta_low: 0.6\n")?;
///
/// let descriptor = ModelDescriptor::load(&path)?;
/// assert!(descriptor.identity().starts_with("threshold@1.2.0#"));
/// assert_eq!(descriptor.effective_threshold(), 0.6);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    version: String,
    content_hash: String,
    identity: String,
    theta_low: f64,
    theta_high: Option<f64>,
}

impl ModelDescriptor {
    /// Loads a descriptor from a YAML model file.
    ///
    /// The raw bytes are read exactly once: the content hash is computed
    /// over them, and the structured fields are parsed from the same
    /// buffer. Fails with [`ConfigError`] when the file is missing,
    /// unreadable, or carries malformed fields (a non-numeric
    /// `theta_low` is an error; an absent one defaults to 0.6).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let bytes = fs::read(path)?;
        let config: ModelConfig = serde_yaml::from_slice(&bytes)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = format!("{:x}", hasher.finalize());
        let content_hash = digest[..7].to_string();
        let identity = format!("threshold@{}#{}", config.model_version, content_hash);

        log::info!(
            "Loaded model {} (theta_low={}, theta_high={:?})",
            identity,
            config.params.theta_low,
            config.params.theta_high
        );

        Ok(Self {
            version: config.model_version,
            content_hash,
            identity,
            theta_low: config.params.theta_low,
            theta_high: config.params.theta_high,
        })
    }

    /// The declared semantic version of the model configuration.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Seven-character hex digest of the model file's raw bytes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// The permanent label for predictions made under this configuration,
    /// in the fixed `threshold@{version}#{hash7}` format.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn theta_low(&self) -> f64 {
        self.theta_low
    }

    pub fn theta_high(&self) -> Option<f64> {
        self.theta_high
    }

    /// The decision threshold actually applied: `theta_high` overrides
    /// `theta_low` when present.
    pub fn effective_threshold(&self) -> f64 {
        self.theta_high.unwrap_or(self.theta_low)
    }
}
