//! ReactMiner Extract: prompt construction and reaction-record parsing.
//!
//! The parser is a deterministic line/block scanner over the model's reply:
//! blank lines separate candidate reactions, `Key: Value` lines fill them in,
//! placeholder values are dropped and incomplete records are discarded.

pub mod parser;
pub mod prompt;
pub mod types;

pub use parser::{assistant_reply, parse_output, parse_reactions, PLACEHOLDER_PHRASES};
pub use prompt::{build_prompt, PromptBuilder, ASSISTANT_MARKER, DEFAULT_INSTRUCTION};
pub use types::{ExtractionResult, ReactionRecord, TextSegment, PRODUCT_KEY};
