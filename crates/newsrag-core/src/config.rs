//! Typed configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `newsrag.toml`,
//! `newsrag.<env>.toml` and `NEWSRAG_*` env vars (`__` separates nested
//! keys, e.g. `NEWSRAG_FUSION__VECTOR_WEIGHT=2`). Every section validates
//! itself; an invalid value is an [`Error::Config`].

use std::env;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Word-window chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size_words: 350, overlap_words: 75 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_words == 0 {
            return Err(Error::Config("chunk_size_words must be > 0".into()));
        }
        if self.overlap_words == 0 {
            return Err(Error::Config("overlap_words must be > 0".into()));
        }
        if self.overlap_words >= self.chunk_size_words {
            return Err(Error::Config(format!(
                "overlap_words ({}) must be smaller than chunk_size_words ({})",
                self.overlap_words, self.chunk_size_words
            )));
        }
        Ok(())
    }

    /// Words the window advances per chunk.
    pub fn stride(&self) -> usize {
        self.chunk_size_words - self.overlap_words
    }
}

/// BM25 tuning. `k1=1.5, b=0.75` are documented defaults, not requirements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
    pub remove_stopwords: bool,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, remove_stopwords: false }
    }
}

impl Bm25Config {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(Error::Config(format!("bm25.k1 must be a finite value >= 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::Config(format!("bm25.b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

/// Reciprocal-rank fusion weights and candidate breadth.
///
/// Equal weights are the safe default; there is no single correct value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub lexical_weight: f32,
    pub vector_weight: f32,
    /// Constant added to each 1-based rank.
    pub rrf_k: f32,
    /// Each source is asked for `top_k * overfetch_multiplier` candidates.
    pub overfetch_multiplier: usize,
    /// Upper bound on per-source candidates when re-querying after filtering.
    pub max_breadth: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { lexical_weight: 1.0, vector_weight: 1.0, rrf_k: 60.0, overfetch_multiplier: 4, max_breadth: 1000 }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [("lexical_weight", self.lexical_weight), ("vector_weight", self.vector_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::Config(format!("fusion.{name} must be a finite value >= 0, got {w}")));
            }
        }
        if self.lexical_weight == 0.0 && self.vector_weight == 0.0 {
            return Err(Error::Config("fusion weights cannot both be zero".into()));
        }
        if !self.rrf_k.is_finite() || self.rrf_k <= 0.0 {
            return Err(Error::Config(format!("fusion.rrf_k must be > 0, got {}", self.rrf_k)));
        }
        if self.overfetch_multiplier == 0 {
            return Err(Error::Config("fusion.overfetch_multiplier must be >= 1".into()));
        }
        if self.max_breadth == 0 {
            return Err(Error::Config("fusion.max_breadth must be >= 1".into()));
        }
        Ok(())
    }
}

/// Embedding provider contract. `dimension` is fixed per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub batch_size: usize,
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimension: 1024, model_dir: None, max_len: 256, batch_size: 32, timeout_ms: 5_000 }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::Config("embedding.dimension must be > 0".into()));
        }
        if self.max_len == 0 {
            return Err(Error::Config("embedding.max_len must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("embedding.batch_size must be > 0".into()));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("embedding.timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}

/// Which nearest-neighbour structure backs the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Flat,
    Ivf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub backend: VectorBackend,
    /// Inverted lists for the IVF backend; derived from corpus size when unset.
    pub nlist: Option<usize>,
    pub nprobe: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { backend: VectorBackend::Flat, nlist: None, nprobe: 8 }
    }
}

impl VectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.nprobe == 0 {
            return Err(Error::Config("vector.nprobe must be >= 1".into()));
        }
        if self.nlist == Some(0) {
            return Err(Error::Config("vector.nlist must be >= 1 when set".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
    pub snapshot_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { data_dir: "data/txt".into(), snapshot_dir: "data/snapshot".into() }
    }
}

/// All engine settings. Passed explicitly; nothing reads ambient state after load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub bm25: Bm25Config,
    pub fusion: FusionConfig,
    pub embedding: EmbeddingConfig,
    pub vector: VectorConfig,
    pub paths: PathsConfig,
}

impl Settings {
    /// Load from the working directory using `NEWSRAG_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("NEWSRAG_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Load `newsrag.toml` and `newsrag.<env>.toml` from `dir`, then env vars.
    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("newsrag.toml")))
            .merge(Toml::file(dir.join(format!("newsrag.{env_name}.toml"))))
            .merge(Env::prefixed("NEWSRAG_").split("__"));
        Self::from_figment(&figment)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Self = figment.extract().map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.bm25.validate()?;
        self.fusion.validate()?;
        self.embedding.validate()?;
        self.vector.validate()
    }

    pub fn data_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.paths.data_dir)
    }

    pub fn snapshot_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.paths.snapshot_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
