//! ONNX-based causal language model generator.
//!
//! Loads an exported decoder (`model.onnx`) and its HuggingFace tokenizer,
//! then generates token by token, re-running the full sequence each step.
//! Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use ndarray::ArrayView1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use reactminer_core::{Error, GenerationRequest, Result};
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use crate::generator::TextGenerator;
    use crate::markers::strip_control_markers;
    use crate::sampler::Sampler;

    /// Hard cap on prompt + generated tokens.
    const MAX_CONTEXT_LEN: usize = 8192;

    /// Tokens that end generation when sampled.
    const EOS_TOKENS: &[&str] = &["<|end_of_text|>", "<|eot_id|>", "</s>"];

    /// ONNX decoder-only text generator.
    pub struct OnnxGenerator {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        eos_ids: Vec<u32>,
    }

    impl OnnxGenerator {
        /// Load an ONNX model and tokenizer from the given directory.
        ///
        /// Expects:
        /// - `model_dir/model.onnx`: decoder taking `input_ids` and `attention_mask`
        /// - `model_dir/tokenizer.json`: the HuggingFace tokenizer
        pub fn load(model_dir: &Path, intra_threads: usize) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(Error::Model(format!(
                    "Model not found: {}",
                    model_path.display()
                )));
            }
            if !tokenizer_path.exists() {
                return Err(Error::Model(format!(
                    "Tokenizer not found: {}",
                    tokenizer_path.display()
                )));
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::Model(format!("Failed to create session builder: {}", e)))?
                .with_intra_threads(intra_threads)
                .map_err(|e| Error::Model(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Model(format!("Failed to load ONNX model: {}", e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Model(format!("Failed to load tokenizer: {}", e)))?;

            let eos_ids: Vec<u32> = EOS_TOKENS
                .iter()
                .filter_map(|t| tokenizer.token_to_id(t))
                .collect();

            info!(
                "ONNX generator loaded: model={}, eos_ids={:?}",
                model_path.display(),
                eos_ids
            );

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                eos_ids,
            })
        }

        /// Logits for the position after the last token of `ids`.
        fn next_token_logits(&self, ids: &[u32]) -> Result<Vec<f32>> {
            let seq_len = ids.len();
            let ids_data: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
            let mask_data: Vec<i64> = vec![1i64; seq_len];

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids_data))
                .map_err(|e| Error::Generation(format!("Failed to create ids tensor: {}", e)))?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask_data))
                .map_err(|e| Error::Generation(format!("Failed to create mask tensor: {}", e)))?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor])
                .map_err(|e| Error::Generation(format!("ONNX inference failed: {}", e)))?;

            // Logits come out as [1, seq_len, vocab].
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Generation(format!("Failed to extract logits: {}", e)))?;

            let dims: Vec<i64> = shape.iter().copied().collect();
            if dims.len() != 3 || dims[1] as usize != seq_len {
                return Err(Error::Generation(format!(
                    "Unexpected logits shape: {:?}",
                    dims
                )));
            }

            let vocab = dims[2] as usize;
            let offset = (seq_len - 1) * vocab;
            Ok(data[offset..offset + vocab].to_vec())
        }
    }

    impl TextGenerator for OnnxGenerator {
        fn generate(&self, request: &GenerationRequest) -> Result<String> {
            let encoding = self
                .tokenizer
                .encode(request.prompt.as_str(), true)
                .map_err(|e| Error::Generation(format!("Tokenization failed: {}", e)))?;

            let mut ids: Vec<u32> = encoding.get_ids().to_vec();
            let prompt_len = ids.len();
            let mut sampler = Sampler::from_config(&request.sampling);

            for _ in 0..request.sampling.max_new_tokens {
                if ids.len() >= MAX_CONTEXT_LEN {
                    debug!("Context limit reached at {} tokens", ids.len());
                    break;
                }
                let logits = self.next_token_logits(&ids)?;
                let next = sampler
                    .sample(ArrayView1::from(&logits[..]))
                    .ok_or_else(|| Error::Generation("Model returned empty logits".into()))?
                    as u32;
                ids.push(next);
                if self.eos_ids.contains(&next) {
                    break;
                }
            }

            debug!("Generated {} tokens", ids.len() - prompt_len);

            let decoded = self
                .tokenizer
                .decode(&ids, true)
                .map_err(|e| Error::Generation(format!("Decoding failed: {}", e)))?;
            Ok(strip_control_markers(&decoded))
        }

        fn name(&self) -> &str {
            "onnx"
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxGenerator;
