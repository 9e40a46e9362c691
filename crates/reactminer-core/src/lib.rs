//! ReactMiner Core: errors, device detection, configuration, sampling parameters.

pub mod capabilities;
pub mod config;
pub mod error;
pub mod sampling;

pub use capabilities::{Accelerator, DeviceCapabilities};
pub use config::{BackendKind, ExtractorConfig, FailurePolicy, ModelSpec};
pub use error::{Error, Result};
pub use sampling::{GenerationOption, GenerationRequest, SamplingConfig, SamplingOverrides};
