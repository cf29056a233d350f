use std::hash::{Hash, Hasher};

use anyhow::{bail, Result};
use twox_hash::XxHash64;

use newsrag_core::traits::Embedder;

/// Deterministic bag-of-words embedder for tests and offline runs.
///
/// Each lower-cased alphanumeric token is hashed into one of `dim` buckets
/// with a hash-derived sign; the sum is L2-normalised. Texts sharing words
/// land close together, which is enough to exercise ranking end to end
/// without a model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), id: format!("hash:d{}", dim.max(1)) }
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        let mut seen = 0usize;
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
            seen += 1;
        }
        if seen == 0 {
            bail!("cannot embed text without any word characters");
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            // Every token cancelled out; fall back to a fixed direction.
            v[0] = 1.0;
            return Ok(v);
        }
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

impl Embedder for HashingEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cos(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed("Strike, at the MILL!").unwrap(), e.embed("strike at the mill").unwrap());
    }

    #[test]
    fn shared_words_mean_higher_similarity() {
        let e = HashingEmbedder::new(256);
        let a = e.embed("steel workers strike at the mill").unwrap();
        let b = e.embed("mill workers strike").unwrap();
        let c = e.embed("election results announced tonight").unwrap();
        assert!(cos(&a, &b) > cos(&a, &c));
    }

    #[test]
    fn empty_text_is_an_error() {
        let e = HashingEmbedder::new(8);
        assert!(e.embed("  ...  ").is_err());
        assert_eq!(e.embedder_id(), "hash:d8");
    }
}
