//! Model reply → reaction records.
//!
//! The reply is a sequence of blank-line separated blocks, one candidate
//! reaction per block, each line `Field: value`. A reply that admits it found
//! "no complete" reaction yields nothing at all.

use tracing::debug;

use crate::prompt::ASSISTANT_MARKER;
use crate::types::ReactionRecord;

/// Values containing any of these (case-insensitive) are treated as absent.
pub const PLACEHOLDER_PHRASES: &[&str] = &[
    "not specified",
    "not mentioned",
    "not available",
    "none",
];

/// Reply marker meaning the model saw no complete reaction.
const NO_REACTION_MARKER: &str = "no complete";

const BLOCK_SEPARATOR: &str = "\n\n";

/// The text after the last assistant marker, trimmed. Without a marker the
/// whole output is used.
pub fn assistant_reply(raw: &str) -> &str {
    raw.rsplit(ASSISTANT_MARKER).next().unwrap_or(raw).trim()
}

/// Parse a full decoded output (prompt included) into reaction records.
pub fn parse_output(raw: &str) -> Vec<ReactionRecord> {
    let reply = assistant_reply(raw);
    if reply.to_lowercase().contains(NO_REACTION_MARKER) {
        debug!("Reply reports no complete reaction");
        return Vec::new();
    }
    parse_reactions(reply)
}

/// Parse reply text into records, keeping only valid ones in block order.
pub fn parse_reactions(reply: &str) -> Vec<ReactionRecord> {
    reply
        .trim()
        .split(BLOCK_SEPARATOR)
        .map(parse_block)
        .filter(ReactionRecord::is_valid)
        .collect()
}

fn parse_block(block: &str) -> ReactionRecord {
    let mut record = ReactionRecord::new();
    for line in block.split('\n') {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if is_placeholder(value) {
            continue;
        }
        record.insert(key.trim(), value);
    }
    record
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    PLACEHOLDER_PHRASES.iter().any(|p| lower.contains(p))
}
