//! Extractor configuration: JSON file, defaults, environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sampling::SamplingConfig;

/// System instruction used when the caller does not supply one.
pub const DEFAULT_INSTRUCTION: &str =
    "You are a helpful assistant in extracting all the chemical reactions from the text provided by the user.";

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080";
pub const DEFAULT_BASE_MODEL: &str = "meta-llama/Meta-Llama-3.1-8B";
pub const DEFAULT_ADAPTER: &str = "TingfengLuo/reaction-miner-8b-lora";
pub const DEFAULT_CONFIG_FILE: &str = "reactminer.json";

/// Model sizes with a published fine-tuned adapter.
pub const SUPPORTED_MODEL_SIZES: &[&str] = &["8b"];

/// Which generation backend drives the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote text-generation server over HTTP.
    Http,
    /// In-process ONNX Runtime session.
    Onnx,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Onnx => write!(f, "onnx"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "onnx" => Ok(Self::Onnx),
            other => Err(Error::Config(format!("Unknown backend: {}", other))),
        }
    }
}

/// What a batch does when one segment's generation call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the batch and return the error; nothing is salvaged.
    #[default]
    Abort,
    /// Record the failure, drop the segment, keep going.
    Skip,
}

/// Model weights the backend serves.
///
/// `base_model`, `adapter` and `load_8bit` describe what the generation server
/// (or the exported ONNX graph) was built from. They are reported by `status`
/// and select the precision label, but are not sent to any backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default = "default_model_size")]
    pub model_size: String,
    #[serde(default = "default_base_model")]
    pub base_model: String,
    /// LoRA adapter merged on top of the base model.
    #[serde(default = "default_adapter")]
    pub adapter: String,
    #[serde(default)]
    pub load_8bit: bool,
    /// Directory holding `model.onnx` and `tokenizer.json` for the ONNX backend.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_model_size() -> String {
    "8b".into()
}
fn default_base_model() -> String {
    DEFAULT_BASE_MODEL.into()
}
fn default_adapter() -> String {
    DEFAULT_ADAPTER.into()
}
fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            model_size: default_model_size(),
            base_model: default_base_model(),
            adapter: default_adapter(),
            load_8bit: false,
            model_dir: default_model_dir(),
        }
    }
}

/// Top-level ReactMiner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout for the HTTP backend. Unset means wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub model: ModelSpec,
    #[serde(default = "default_instruction")]
    pub instruction: String,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_backend() -> BackendKind {
    BackendKind::Http
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_instruction() -> String {
    DEFAULT_INSTRUCTION.into()
}
fn default_port() -> u16 {
    3010
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: default_endpoint(),
            request_timeout_secs: None,
            model: ModelSpec::default(),
            instruction: default_instruction(),
            sampling: SamplingConfig::default(),
            failure_policy: FailurePolicy::default(),
            port: default_port(),
        }
    }
}

impl ExtractorConfig {
    /// Load configuration from `REACTMINER_CONFIG` (or `reactminer.json`),
    /// then apply environment overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("REACTMINER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let mut config = Self::load(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => {
                let config: Self = serde_json::from_str(&data)?;
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `REACTMINER_BACKEND`, `REACTMINER_ENDPOINT`, `REACTMINER_MODEL_DIR`
    /// and `PORT` from the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("REACTMINER_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(endpoint) = lookup("REACTMINER_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(dir) = lookup("REACTMINER_MODEL_DIR") {
            self.model.model_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PORT: {}", port)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_MODEL_SIZES.contains(&self.model.model_size.as_str()) {
            return Err(Error::Config(format!(
                "Unsupported model size '{}', expected one of {:?}",
                self.model.model_size, SUPPORTED_MODEL_SIZES
            )));
        }
        if self.backend == BackendKind::Http && self.endpoint.trim().is_empty() {
            return Err(Error::Config("HTTP backend requires an endpoint".into()));
        }
        self.sampling.validate()
    }

    /// Save config to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::sampling::GenerationOption;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractorConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.backend, BackendKind::Http);
        assert_eq!(config.instruction, DEFAULT_INSTRUCTION);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.model.adapter, DEFAULT_ADAPTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reactminer.json");
        std::fs::write(
            &path,
            r#"{
                "backend": "onnx",
                "failure_policy": "skip",
                "sampling": {"temperature": 0.3, "repetition_penalty": 1.05}
            }"#,
        )
        .unwrap();

        let config = ExtractorConfig::load(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Onnx);
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.sampling.temperature, 0.3);
        assert_eq!(config.sampling.top_p, 0.75);
        assert_eq!(
            config.sampling.option("repetition_penalty"),
            Some(&GenerationOption::Float(1.05))
        );
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ExtractorConfig::load(&path), Err(Error::Json(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REACTMINER_BACKEND", "ONNX"),
            ("REACTMINER_ENDPOINT", "http://gpu-box:9000"),
            ("REACTMINER_MODEL_DIR", "/opt/models/reaction-miner"),
            ("PORT", "4000"),
        ]
        .into_iter()
        .collect();

        let mut config = ExtractorConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.backend, BackendKind::Onnx);
        assert_eq!(config.endpoint, "http://gpu-box:9000");
        assert_eq!(config.model.model_dir, PathBuf::from("/opt/models/reaction-miner"));
        assert_eq!(config.port, 4000);

        let mut bad = ExtractorConfig::default();
        assert!(bad
            .apply_env_overrides(|k| (k == "PORT").then(|| "eighty".to_string()))
            .is_err());
    }

    #[test]
    fn test_unsupported_model_size() {
        let mut config = ExtractorConfig::default();
        config.model.model_size = "7b".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reactminer.json");
        let mut config = ExtractorConfig::default();
        config.port = 3999;
        config.save(&path).unwrap();

        let loaded = ExtractorConfig::load(&path).unwrap();
        assert_eq!(loaded.port, 3999);
        assert_eq!(loaded.sampling, config.sampling);
    }
}
