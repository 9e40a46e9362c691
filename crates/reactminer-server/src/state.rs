//! Shared application state.

use std::sync::Arc;

use parking_lot::Mutex;
use reactminer_core::{ExtractorConfig, Result, SamplingConfig};
use reactminer_infer::ModelContext;
use reactminer_runtime::{BatchInput, BatchOutcome, ReactionExtractor};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: ExtractorConfig,
    pub context: Arc<ModelContext>,
    /// Held for the whole batch so the generator is never driven concurrently.
    extraction_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: ExtractorConfig, context: Arc<ModelContext>) -> Self {
        Self {
            config,
            context,
            extraction_lock: Mutex::new(()),
        }
    }

    /// Run one batch synchronously. Blocks; call from a blocking thread.
    pub fn run_batch(
        &self,
        input: BatchInput,
        instruction: Option<String>,
        sampling: &SamplingConfig,
    ) -> Result<BatchOutcome> {
        let _guard = self.extraction_lock.lock();
        let mut extractor = ReactionExtractor::from_config(&self.context, &self.config);
        if let Some(instruction) = instruction {
            extractor = extractor.with_instruction(instruction);
        }
        extractor.extract_detailed(input, sampling)
    }
}
