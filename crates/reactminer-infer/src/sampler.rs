//! Next-token selection from a logit vector.
//!
//! Applies temperature, then top-k, then top-p (nucleus) filtering, and draws
//! from the renormalised distribution. Greedy argmax when sampling is off or
//! the temperature is zero.

use ndarray::ArrayView1;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reactminer_core::SamplingConfig;

pub struct Sampler {
    rng: StdRng,
    temperature: f32,
    top_k: usize,
    top_p: f32,
    do_sample: bool,
}

impl Sampler {
    /// Build a sampler; a `seed` option makes draws reproducible.
    pub fn from_config(config: &SamplingConfig) -> Self {
        let rng = match config.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            temperature: config.temperature as f32,
            top_k: config.top_k as usize,
            top_p: config.top_p as f32,
            do_sample: config.do_sample,
        }
    }

    /// Pick the next token id. `None` only for an empty vocabulary.
    pub fn sample(&mut self, logits: ArrayView1<f32>) -> Option<usize> {
        if logits.is_empty() {
            return None;
        }
        if !self.do_sample || self.temperature <= 0.0 {
            return argmax(logits);
        }

        let mut candidates: Vec<(usize, f32)> = logits
            .iter()
            .map(|&l| l / self.temperature)
            .enumerate()
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        if self.top_k > 0 && self.top_k < candidates.len() {
            candidates.truncate(self.top_k);
        }

        let max = candidates[0].1;
        let mut probs: Vec<f32> = candidates.iter().map(|&(_, l)| (l - max).exp()).collect();
        let sum: f32 = probs.iter().sum();
        probs.iter_mut().for_each(|p| *p /= sum);

        if self.top_p < 1.0 {
            let mut cumulative = 0.0f32;
            let mut keep = probs.len();
            for (i, p) in probs.iter().enumerate() {
                cumulative += *p;
                if cumulative >= self.top_p {
                    keep = i + 1;
                    break;
                }
            }
            probs.truncate(keep);
            candidates.truncate(keep);
        }

        match WeightedIndex::new(&probs) {
            Ok(dist) => Some(candidates[dist.sample(&mut self.rng)].0),
            Err(_) => Some(candidates[0].0),
        }
    }
}

fn argmax(logits: ArrayView1<f32>) -> Option<usize> {
    logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
