//! Text generation trait and an in-process scripted implementation.
//!
//! The `TextGenerator` trait is the only seam between the extraction pipeline
//! and the model. Implementations:
//! - `HttpGenerator`: remote text-generation server
//! - `OnnxGenerator`: ONNX Runtime session (requires the `onnx` feature)
//! - `ScriptedGenerator`: replays queued continuations, for tests and wiring checks

use std::collections::VecDeque;

use parking_lot::Mutex;
use reactminer_core::{Error, GenerationRequest, Result};

/// A blocking text generator.
///
/// `generate` returns the decoded full sequence (prompt followed by the
/// continuation) with tokenizer control markers removed. Role markers such
/// as `<|assistant|>` are ordinary text and must survive decoding.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Short backend identifier for logs and status output.
    fn name(&self) -> &str;

    /// Whether the backend is ready to serve requests.
    fn is_available(&self) -> bool {
        true
    }
}

enum ScriptedReply {
    Continuation(String),
    Failure(String),
}

/// Generator that answers from a queue of prepared continuations.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a continuation; the reply is `prompt + continuation`.
    pub fn push_reply(&self, continuation: impl Into<String>) {
        self.replies
            .lock()
            .push_back(ScriptedReply::Continuation(continuation.into()));
    }

    /// Queue a generation failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .push_back(ScriptedReply::Failure(message.into()));
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.prompts.lock().push(request.prompt.clone());
        match self.replies.lock().pop_front() {
            Some(ScriptedReply::Continuation(text)) => Ok(format!("{}{}", request.prompt, text)),
            Some(ScriptedReply::Failure(msg)) => Err(Error::Generation(msg)),
            None => Err(Error::Generation("no scripted reply left".into())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
