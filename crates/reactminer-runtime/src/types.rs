//! Runtime types.

use reactminer_extract::{ExtractionResult, TextSegment};
use serde::{Deserialize, Serialize};

/// Batch input: one text or an ordered list of texts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BatchInput {
    One(String),
    Many(Vec<String>),
}

impl BatchInput {
    /// Normalise to an ordered list of segments.
    pub fn into_segments(self) -> Vec<TextSegment> {
        match self {
            Self::One(text) => vec![TextSegment::from(text)],
            Self::Many(texts) => texts.into_iter().map(TextSegment::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for BatchInput {
    fn from(text: &str) -> Self {
        Self::One(text.to_string())
    }
}

impl From<String> for BatchInput {
    fn from(text: String) -> Self {
        Self::One(text)
    }
}

impl From<Vec<String>> for BatchInput {
    fn from(texts: Vec<String>) -> Self {
        Self::Many(texts)
    }
}

impl From<Vec<&str>> for BatchInput {
    fn from(texts: Vec<&str>) -> Self {
        Self::Many(texts.into_iter().map(str::to_string).collect())
    }
}

/// A segment whose generation call failed under the skip policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentFailure {
    /// Position of the segment in the batch input.
    pub index: usize,
    pub error: String,
}

/// Results of a batch plus bookkeeping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// Segments with at least one reaction, in input order.
    pub results: Vec<ExtractionResult>,
    pub failures: Vec<SegmentFailure>,
    /// Segments sent to the generator.
    pub processed: usize,
}
