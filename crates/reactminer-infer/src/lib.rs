//! ReactMiner Infer: text generation backends, token sampling, model context.
//!
//! Provides the `TextGenerator` trait the extraction pipeline drives.
//! When the `onnx` feature is enabled and model files are present,
//! `OnnxGenerator` runs the model in-process. Otherwise `HttpGenerator`
//! talks to a text-generation server.

pub mod generator;
pub mod http_generator;
pub mod markers;
pub mod onnx_generator;
pub mod sampler;

pub use generator::{ScriptedGenerator, TextGenerator};
pub use http_generator::HttpGenerator;
pub use markers::strip_control_markers;
pub use sampler::Sampler;

#[cfg(feature = "onnx")]
pub use onnx_generator::OnnxGenerator;

use std::sync::Arc;
use std::time::Duration;

use reactminer_core::{
    Accelerator, BackendKind, DeviceCapabilities, ExtractorConfig, ModelSpec, Result,
};
use serde::Serialize;
use tracing::info;

/// Create the configured generator.
///
/// Tries ONNX first when requested (and the feature is enabled),
/// falls back to the HTTP backend.
pub fn create_generator(
    config: &ExtractorConfig,
    capabilities: &DeviceCapabilities,
) -> Result<Arc<dyn TextGenerator>> {
    if config.backend == BackendKind::Onnx {
        #[cfg(feature = "onnx")]
        {
            match OnnxGenerator::load(&config.model.model_dir, capabilities.cpu_cores) {
                Ok(generator) => {
                    info!("Using ONNX generator from {}", config.model.model_dir.display());
                    return Ok(Arc::new(generator));
                }
                Err(e) => {
                    tracing::warn!("ONNX generator unavailable: {}. Falling back to HTTP.", e);
                }
            }
        }

        #[cfg(not(feature = "onnx"))]
        {
            let _ = capabilities;
            tracing::warn!("ONNX feature disabled. Falling back to HTTP generator.");
        }
    }

    let timeout = config.request_timeout_secs.map(Duration::from_secs);
    let generator = HttpGenerator::new(config.endpoint.clone(), timeout)?;
    info!("Using HTTP generator at {}", generator.endpoint());
    Ok(Arc::new(generator))
}

/// Process-wide model context: the device and the generator bound to it.
///
/// Built once at startup and shared read-only by every extraction batch.
pub struct ModelContext {
    capabilities: DeviceCapabilities,
    model: ModelSpec,
    generator: Arc<dyn TextGenerator>,
}

/// Serializable view of a `ModelContext`.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub accelerator: Accelerator,
    pub precision: &'static str,
    pub generator: String,
    #[serde(rename = "generatorAvailable")]
    pub generator_available: bool,
    #[serde(rename = "baseModel")]
    pub base_model: String,
    pub adapter: String,
}

impl ModelContext {
    /// Detect the device and create the configured generator.
    pub fn initialize(config: &ExtractorConfig) -> Result<Self> {
        let capabilities = DeviceCapabilities::discover();
        let generator = create_generator(config, &capabilities)?;
        let context = Self::with_generator(capabilities, config.model.clone(), generator);
        info!(
            "Model context ready: {} + {} on {} ({})",
            context.model.base_model,
            context.model.adapter,
            context.accelerator(),
            context.precision()
        );
        Ok(context)
    }

    /// Assemble a context around an existing generator.
    pub fn with_generator(
        capabilities: DeviceCapabilities,
        model: ModelSpec,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            capabilities,
            model,
            generator,
        }
    }

    pub fn accelerator(&self) -> Accelerator {
        self.capabilities.accelerator
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    /// Weight precision implied by the model spec and device.
    pub fn precision(&self) -> &'static str {
        if self.model.load_8bit {
            "int8"
        } else if self.accelerator().supports_half_precision() {
            "fp16"
        } else {
            "fp32"
        }
    }

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            accelerator: self.accelerator(),
            precision: self.precision(),
            generator: self.generator.name().to_string(),
            generator_available: self.generator.is_available(),
            base_model: self.model.base_model.clone(),
            adapter: self.model.adapter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_caps() -> DeviceCapabilities {
        DeviceCapabilities {
            total_ram_bytes: 0,
            cpu_cores: 4,
            accelerator: Accelerator::Cpu,
        }
    }

    #[test]
    fn test_context_summary() {
        let context = ModelContext::with_generator(
            cpu_caps(),
            ModelSpec::default(),
            Arc::new(ScriptedGenerator::new()),
        );
        let summary = context.summary();
        assert_eq!(summary.accelerator, Accelerator::Cpu);
        assert_eq!(summary.precision, "fp32");
        assert_eq!(summary.generator, "scripted");
        assert!(summary.generator_available);
    }

    #[test]
    fn test_precision_prefers_8bit() {
        let mut model = ModelSpec::default();
        model.load_8bit = true;
        let caps = DeviceCapabilities {
            accelerator: Accelerator::Cuda,
            ..cpu_caps()
        };
        let context = ModelContext::with_generator(caps, model, Arc::new(ScriptedGenerator::new()));
        assert_eq!(context.precision(), "int8");
    }

    #[test]
    fn test_http_is_default_backend() {
        let config = ExtractorConfig::default();
        let generator = create_generator(&config, &cpu_caps()).unwrap();
        assert_eq!(generator.name(), "http");
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_request_falls_back_without_feature() {
        let mut config = ExtractorConfig::default();
        config.backend = BackendKind::Onnx;
        let generator = create_generator(&config, &cpu_caps()).unwrap();
        assert_eq!(generator.name(), "http");
    }
}
