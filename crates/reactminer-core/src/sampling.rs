//! Sampling configuration and per-segment generation requests.
//!
//! `SamplingConfig` carries the five named decoding parameters plus an open
//! set of extra options that are handed to the generation backend verbatim.
//! Extra option names may never shadow a named field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_TEMPERATURE: f64 = 0.1;
pub const DEFAULT_TOP_P: f64 = 0.75;
pub const DEFAULT_TOP_K: u32 = 40;
pub const DEFAULT_DO_SAMPLE: bool = true;
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1024;

/// Names owned by the fixed fields of `SamplingConfig`.
pub const NAMED_FIELDS: &[&str] = &[
    "temperature",
    "top_p",
    "top_k",
    "do_sample",
    "max_new_tokens",
];

/// Value of an extra generation option. Mirrors the JSON value it came from,
/// so lists such as `stop` or `eos_token_id` and explicit nulls pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOption {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<GenerationOption>),
    Map(BTreeMap<String, GenerationOption>),
}

impl GenerationOption {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for GenerationOption {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for GenerationOption {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for GenerationOption {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for GenerationOption {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for GenerationOption {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for GenerationOption {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<GenerationOption>> From<Vec<T>> for GenerationOption {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Decoding parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub do_sample: bool,
    pub max_new_tokens: u32,
    /// Extra options, serialized next to the named fields.
    #[serde(flatten)]
    extensions: BTreeMap<String, GenerationOption>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            do_sample: DEFAULT_DO_SAMPLE,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            extensions: BTreeMap::new(),
        }
    }
}

impl SamplingConfig {
    /// Build a validated configuration with no extra options.
    pub fn new(
        temperature: f64,
        top_p: f64,
        top_k: u32,
        do_sample: bool,
        max_new_tokens: u32,
    ) -> Result<Self> {
        let config = Self {
            temperature,
            top_p,
            top_k,
            do_sample,
            max_new_tokens,
            extensions: BTreeMap::new(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Builder-style variant of [`insert_option`](Self::insert_option).
    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<GenerationOption>,
    ) -> Result<Self> {
        self.insert_option(key, value)?;
        Ok(self)
    }

    /// Add an extra option. Rejects names that belong to a named field.
    pub fn insert_option(
        &mut self,
        key: impl Into<String>,
        value: impl Into<GenerationOption>,
    ) -> Result<()> {
        let key = key.into();
        check_option_name(&key)?;
        self.extensions.insert(key, value.into());
        Ok(())
    }

    pub fn option(&self, key: &str) -> Option<&GenerationOption> {
        self.extensions.get(key)
    }

    /// Extra options in name order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &GenerationOption)> {
        self.extensions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// RNG seed, if the caller pinned one through the `seed` option.
    pub fn seed(&self) -> Option<u64> {
        self.option("seed")
            .and_then(|v| v.as_i64())
            .and_then(|v| u64::try_from(v).ok())
    }

    /// Check value ranges and extension names.
    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::InvalidSamplingOption(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(Error::InvalidSamplingOption(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if self.max_new_tokens == 0 {
            return Err(Error::InvalidSamplingOption(
                "max_new_tokens must be at least 1".into(),
            ));
        }
        for key in self.extensions.keys() {
            check_option_name(key)?;
        }
        Ok(())
    }
}

fn check_option_name(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidSamplingOption("empty option name".into()));
    }
    if NAMED_FIELDS.contains(&key) {
        return Err(Error::InvalidSamplingOption(format!(
            "'{}' is a named sampling field and cannot be passed as an extra option",
            key
        )));
    }
    Ok(())
}

/// Partial sampling settings supplied per call; unset fields keep the base value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SamplingOverrides {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub do_sample: Option<bool>,
    pub max_new_tokens: Option<u32>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, GenerationOption>,
}

impl SamplingOverrides {
    /// Merge onto `base` and validate the result.
    pub fn apply(self, base: &SamplingConfig) -> Result<SamplingConfig> {
        let mut config = base.clone();
        if let Some(v) = self.temperature {
            config.temperature = v;
        }
        if let Some(v) = self.top_p {
            config.top_p = v;
        }
        if let Some(v) = self.top_k {
            config.top_k = v;
        }
        if let Some(v) = self.do_sample {
            config.do_sample = v;
        }
        if let Some(v) = self.max_new_tokens {
            config.max_new_tokens = v;
        }
        for (key, value) in self.extensions {
            config.insert_option(key, value)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Prompt plus sampling settings, built fresh for every segment.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub sampling: SamplingConfig,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, sampling: SamplingConfig) -> Self {
        Self {
            prompt: prompt.into(),
            sampling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SamplingConfig::default();
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.top_p, 0.75);
        assert_eq!(config.top_k, 40);
        assert!(config.do_sample);
        assert_eq!(config.max_new_tokens, 1024);
        assert_eq!(config.options().count(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extension_collision_rejected() {
        for name in NAMED_FIELDS {
            let err = SamplingConfig::default().with_option(*name, 1).unwrap_err();
            assert!(matches!(err, Error::InvalidSamplingOption(_)));
        }
    }

    #[test]
    fn test_extension_passthrough() {
        let config = SamplingConfig::default()
            .with_option("repetition_penalty", 1.1)
            .unwrap()
            .with_option("seed", 7)
            .unwrap();
        assert_eq!(
            config.option("repetition_penalty"),
            Some(&GenerationOption::Float(1.1))
        );
        assert_eq!(config.seed(), Some(7));
    }

    #[test]
    fn test_range_validation() {
        assert!(SamplingConfig::new(-0.5, 0.75, 40, true, 1024).is_err());
        assert!(SamplingConfig::new(0.1, 0.0, 40, true, 1024).is_err());
        assert!(SamplingConfig::new(0.1, 1.5, 40, true, 1024).is_err());
        assert!(SamplingConfig::new(0.1, 0.75, 40, true, 0).is_err());
        assert!(SamplingConfig::new(0.0, 1.0, 0, false, 1).is_ok());
    }

    #[test]
    fn test_deserialize_flattens_extensions() {
        let config: SamplingConfig = serde_json::from_str(
            r#"{"temperature": 0.5, "repetition_penalty": 1.2, "num_beams": 4, "stop": "END"}"#,
        )
        .unwrap();
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.top_k, 40);
        assert_eq!(config.option("num_beams"), Some(&GenerationOption::Int(4)));
        assert_eq!(
            config.option("stop"),
            Some(&GenerationOption::Text("END".into()))
        );

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["num_beams"], 4);
        assert_eq!(value["max_new_tokens"], 1024);
    }

    #[test]
    fn test_overrides_merge() {
        let overrides: SamplingOverrides =
            serde_json::from_str(r#"{"top_k": 10, "typical_p": 0.9}"#).unwrap();
        let merged = overrides.apply(&SamplingConfig::default()).unwrap();
        assert_eq!(merged.top_k, 10);
        assert_eq!(merged.temperature, 0.1);
        assert_eq!(merged.option("typical_p"), Some(&GenerationOption::Float(0.9)));

        let bad: SamplingOverrides = serde_json::from_str(r#"{"top_p": 2.0}"#).unwrap();
        assert!(bad.apply(&SamplingConfig::default()).is_err());
    }

    #[test]
    fn test_list_and_null_options() {
        let config: SamplingConfig = serde_json::from_str(
            r#"{"stop": ["END", "\n\n\n"], "eos_token_id": [128001, 128009], "grammar": null}"#,
        )
        .unwrap();
        assert_eq!(
            config.option("stop"),
            Some(&GenerationOption::from(vec!["END", "\n\n\n"]))
        );
        assert_eq!(
            config.option("eos_token_id"),
            Some(&GenerationOption::List(vec![
                GenerationOption::Int(128001),
                GenerationOption::Int(128009),
            ]))
        );
        assert_eq!(config.option("grammar"), Some(&GenerationOption::Null));

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["stop"], serde_json::json!(["END", "\n\n\n"]));
        assert_eq!(value["eos_token_id"], serde_json::json!([128001, 128009]));
        assert!(value["grammar"].is_null());
    }

    #[test]
    fn test_overrides_accept_list_map_and_null() {
        let overrides: SamplingOverrides = serde_json::from_str(
            r#"{"stop": ["END"], "seed": null, "logit_bias": {"42": -100}}"#,
        )
        .unwrap();
        let merged = overrides.apply(&SamplingConfig::default()).unwrap();
        assert_eq!(merged.option("stop"), Some(&GenerationOption::from(vec!["END"])));
        assert_eq!(merged.option("seed"), Some(&GenerationOption::Null));
        assert_eq!(merged.seed(), None);
        assert!(matches!(
            merged.option("logit_bias"),
            Some(GenerationOption::Map(m)) if m.get("42") == Some(&GenerationOption::Int(-100))
        ));
    }
}
