//! Runtime orchestrator: drives segments through prompt, generation and parsing.
//!
//! Segments are processed one at a time in input order; each generation call
//! blocks until the model has answered.

pub mod orchestrator;
pub mod types;

pub use orchestrator::ReactionExtractor;
pub use types::*;
