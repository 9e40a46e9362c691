//! Tokenizer control markers that never belong in decoded text.

/// Special tokens emitted by Llama-family tokenizers. Role markers
/// (`<|system|>`, `<|user|>`, `<|assistant|>`) are deliberately absent.
pub const CONTROL_MARKERS: &[&str] = &[
    "<|begin_of_text|>",
    "<|end_of_text|>",
    "<|eot_id|>",
    "<|start_header_id|>",
    "<|end_header_id|>",
    "<s>",
    "</s>",
    "<unk>",
    "<pad>",
];

/// Remove every control marker from `text`.
pub fn strip_control_markers(text: &str) -> String {
    let mut out = text.to_string();
    for marker in CONTROL_MARKERS {
        if out.contains(marker) {
            out = out.replace(marker, "");
        }
    }
    out
}
