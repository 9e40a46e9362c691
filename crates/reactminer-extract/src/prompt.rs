//! Chat-style prompt template the fine-tuned model was trained on.

pub use reactminer_core::config::DEFAULT_INSTRUCTION;

pub const SYSTEM_MARKER: &str = "<|system|>\n";
pub const USER_MARKER: &str = "<|user|>\n";
/// Everything after the last occurrence of this marker is the model's reply.
pub const ASSISTANT_MARKER: &str = "<|assistant|>\n";

/// Format `instruction` and `segment` into the prompt template.
///
/// Format: `"<|system|>\n{instruction}\n\n<|user|>\n{segment}\n\n<|assistant|>\n"`
pub fn build_prompt(instruction: &str, segment: &str) -> String {
    format!(
        "{SYSTEM_MARKER}{instruction}\n\n{USER_MARKER}{segment}\n\n{ASSISTANT_MARKER}"
    )
}

/// Prompt factory bound to one system instruction.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instruction: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTION)
    }
}

impl PromptBuilder {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Build the prompt for a segment, trimming it first.
    pub fn build(&self, segment: &str) -> String {
        build_prompt(&self.instruction, segment.trim())
    }
}
