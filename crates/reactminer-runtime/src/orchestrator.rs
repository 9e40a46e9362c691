//! Orchestrator: runs a batch of segments through the extraction pipeline.

use std::time::Instant;

use reactminer_core::{ExtractorConfig, FailurePolicy, GenerationRequest, Result, SamplingConfig};
use reactminer_extract::{parse_output, ExtractionResult, PromptBuilder, TextSegment};
use reactminer_infer::ModelContext;
use tracing::{debug, error, info, warn};

use crate::types::*;

/// Batch extractor: prompt → generate → parse for every segment, in order.
pub struct ReactionExtractor<'a> {
    context: &'a ModelContext,
    prompts: PromptBuilder,
    policy: FailurePolicy,
}

impl<'a> ReactionExtractor<'a> {
    /// Extractor with the default instruction and the abort policy.
    pub fn new(context: &'a ModelContext) -> Self {
        Self {
            context,
            prompts: PromptBuilder::default(),
            policy: FailurePolicy::Abort,
        }
    }

    /// Extractor using the instruction and failure policy from `config`.
    pub fn from_config(context: &'a ModelContext, config: &ExtractorConfig) -> Self {
        Self::new(context)
            .with_instruction(config.instruction.clone())
            .with_policy(config.failure_policy)
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.prompts = PromptBuilder::new(instruction);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Extract reactions from one text or a list of texts.
    ///
    /// Segments without any accepted reaction are left out; survivors keep
    /// their input order.
    pub fn extract(
        &self,
        input: impl Into<BatchInput>,
        sampling: &SamplingConfig,
    ) -> Result<Vec<ExtractionResult>> {
        Ok(self.extract_detailed(input, sampling)?.results)
    }

    /// Like [`extract`](Self::extract), also reporting skipped failures.
    ///
    /// Under `FailurePolicy::Abort` the first generation error ends the batch
    /// and is returned; results gathered so far are discarded.
    pub fn extract_detailed(
        &self,
        input: impl Into<BatchInput>,
        sampling: &SamplingConfig,
    ) -> Result<BatchOutcome> {
        sampling.validate()?;

        let segments = input.into().into_segments();
        let total = segments.len();
        let started = Instant::now();
        info!(
            "Extracting reactions from {} segment(s) with {} generator",
            total,
            self.context.generator().name()
        );

        let mut outcome = BatchOutcome::default();
        for (index, segment) in segments.iter().enumerate() {
            let segment_started = Instant::now();
            outcome.processed += 1;

            match self.extract_segment(segment, sampling) {
                Ok(Some(result)) => {
                    debug!(
                        "Segment {}/{}: {} reaction(s) in {}ms",
                        index + 1,
                        total,
                        result.reactions.len(),
                        segment_started.elapsed().as_millis()
                    );
                    outcome.results.push(result);
                }
                Ok(None) => {
                    debug!("Segment {}/{}: no reactions", index + 1, total);
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        error!("Segment {}/{} failed, aborting batch: {}", index + 1, total, e);
                        return Err(e);
                    }
                    FailurePolicy::Skip => {
                        warn!("Segment {}/{} failed, skipping: {}", index + 1, total, e);
                        outcome.failures.push(SegmentFailure {
                            index,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        info!(
            "Extraction complete: {}/{} segment(s) with reactions, {} failed, {}ms",
            outcome.results.len(),
            total,
            outcome.failures.len(),
            started.elapsed().as_millis()
        );
        Ok(outcome)
    }

    /// Run one segment. `Ok(None)` when the model reported no usable reaction.
    pub fn extract_segment(
        &self,
        segment: &TextSegment,
        sampling: &SamplingConfig,
    ) -> Result<Option<ExtractionResult>> {
        let text = segment.trimmed();
        let request = GenerationRequest::new(self.prompts.build(text.as_str()), sampling.clone());
        let raw = self.context.generator().generate(&request)?;

        let reactions = parse_output(&raw);
        if reactions.is_empty() {
            return Ok(None);
        }
        Ok(Some(ExtractionResult { text, reactions }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use reactminer_core::{Accelerator, DeviceCapabilities, Error, ModelSpec};
    use reactminer_extract::{build_prompt, DEFAULT_INSTRUCTION};
    use reactminer_infer::ScriptedGenerator;

    fn test_context() -> (ModelContext, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::new());
        let caps = DeviceCapabilities {
            total_ram_bytes: 0,
            cpu_cores: 1,
            accelerator: Accelerator::Cpu,
        };
        let context = ModelContext::with_generator(caps, ModelSpec::default(), generator.clone());
        (context, generator)
    }

    #[test]
    fn test_single_segment() {
        let (context, generator) = test_context();
        generator.push_reply("Reactant: benzaldehyde\nProduct: benzyl alcohol\nYield: 92%");

        let extractor = ReactionExtractor::new(&context);
        let results = extractor
            .extract("  Benzaldehyde was reduced with NaBH4.  ", &SamplingConfig::default())
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text.as_str(), "Benzaldehyde was reduced with NaBH4.");
        assert_eq!(results[0].reactions[0].get("Yield"), Some("92%"));
        assert_eq!(
            generator.prompts(),
            vec![build_prompt(
                DEFAULT_INSTRUCTION,
                "Benzaldehyde was reduced with NaBH4."
            )]
        );
    }

    #[test]
    fn test_segments_without_reactions_dropped() {
        let (context, generator) = test_context();
        generator.push_reply("Product: A\nYield: 1%");
        generator.push_reply("No complete reaction.");
        generator.push_reply("Catalyst: Pd\n\nProduct: not specified\nYield: 3%");
        generator.push_reply("Product: D\nSolvent: THF\n\nProduct: E\nTime: 1 h");

        let extractor = ReactionExtractor::new(&context);
        let outcome = extractor
            .extract_detailed(vec!["s1", "s2", "s3", "s4"], &SamplingConfig::default())
            .unwrap();

        assert_eq!(outcome.processed, 4);
        assert!(outcome.failures.is_empty());
        let texts: Vec<&str> = outcome.results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["s1", "s4"]);
        assert_eq!(outcome.results[1].reactions.len(), 2);
        for result in &outcome.results {
            assert!(!result.reactions.is_empty());
            assert!(result.reactions.iter().all(|r| r.is_valid()));
        }
    }

    #[test]
    fn test_no_dedup_across_segments() {
        let (context, generator) = test_context();
        generator.push_reply("Product: A\nYield: 1%");
        generator.push_reply("Product: A\nYield: 1%");

        let extractor = ReactionExtractor::new(&context);
        let results = extractor
            .extract(vec!["same", "same"], &SamplingConfig::default())
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_abort_policy_stops_batch() {
        let (context, generator) = test_context();
        generator.push_reply("Product: A\nYield: 1%");
        generator.push_failure("CUDA out of memory");
        generator.push_reply("Product: C\nYield: 3%");

        let extractor = ReactionExtractor::new(&context);
        let err = extractor
            .extract(vec!["s1", "s2", "s3"], &SamplingConfig::default())
            .unwrap_err();

        assert!(matches!(err, Error::Generation(msg) if msg.contains("out of memory")));
        // The third segment was never sent.
        assert_eq!(generator.prompts().len(), 2);
        assert_eq!(generator.remaining(), 1);
    }

    #[test]
    fn test_skip_policy_records_failure() {
        let (context, generator) = test_context();
        generator.push_reply("Product: A\nYield: 1%");
        generator.push_failure("device lost");
        generator.push_reply("Product: C\nYield: 3%");

        let extractor = ReactionExtractor::new(&context).with_policy(FailurePolicy::Skip);
        let outcome = extractor
            .extract_detailed(vec!["s1", "s2", "s3"], &SamplingConfig::default())
            .unwrap();

        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].text.as_str(), "s3");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 1);
        assert!(outcome.failures[0].error.contains("device lost"));
    }

    #[test]
    fn test_custom_instruction_from_config() {
        let (context, generator) = test_context();
        generator.push_reply("");

        let mut config = ExtractorConfig::default();
        config.instruction = "List reactions.".into();
        config.failure_policy = FailurePolicy::Skip;

        let extractor = ReactionExtractor::from_config(&context, &config);
        assert_eq!(extractor.policy(), FailurePolicy::Skip);
        let results = extractor.extract("text", &SamplingConfig::default()).unwrap();
        assert!(results.is_empty());
        assert!(generator.prompts()[0].starts_with("<|system|>\nList reactions.\n\n"));
    }

    #[test]
    fn test_invalid_sampling_rejected_before_generation() {
        let (context, generator) = test_context();
        let mut sampling = SamplingConfig::default();
        sampling.top_p = 0.0;

        let extractor = ReactionExtractor::new(&context);
        assert!(matches!(
            extractor.extract("text", &sampling),
            Err(Error::InvalidSamplingOption(_))
        ));
        assert!(generator.prompts().is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let (context, _generator) = test_context();
        let extractor = ReactionExtractor::new(&context);
        let outcome = extractor
            .extract_detailed(Vec::<String>::new(), &SamplingConfig::default())
            .unwrap();
        assert_eq!(outcome.processed, 0);
        assert!(outcome.results.is_empty());
    }
}
