//! Layered configuration and path helpers.
//!
//! Figment merges compiled-in defaults, `config.toml`, `config.<env>.toml`
//! (selected by `RUST_ENV`), an optional extra file, then `APP_*` env vars.
//! Nested keys use `__` in env vars: `APP_EMBEDDING__STRATEGY=semantic`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunking::ChunkingConfig;
use crate::error::{Error, Result};

pub const DEFAULT_DIMENSION: usize = 384;
pub const DEFAULT_TOP_K: usize = 3;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."), None)
    }

    /// Load `config*.toml` from `base_dir`, then `extra` if given.
    pub fn load_from(base_dir: &Path, extra: Option<&Path>) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => {
                figment = figment.merge(Toml::file(base_dir.join("config.dev.toml")))
            }
            "prod" | "production" => {
                figment = figment.merge(Toml::file(base_dir.join("config.prod.toml")))
            }
            "test" | "testing" => {
                figment = figment.merge(Toml::file(base_dir.join("config.test.toml")))
            }
            other => tracing::debug!(env = other, "no env-specific config file for RUST_ENV"),
        }
        if let Some(path) = extra {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base_dir: base_dir.to_path_buf() })
    }

    /// Build a config from an explicit figment, e.g. in tests.
    pub fn from_figment(figment: Figment, base_dir: &Path) -> Self {
        Self { figment, base_dir: base_dir.to_path_buf() }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the typed settings. A relative `model_dir` is
    /// resolved against the directory the config was loaded from.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        if let Some(dir) = settings.embedding.model_dir.take() {
            let resolved = resolve_with_base(&self.base_dir, dir);
            settings.embedding.model_dir = Some(resolved.to_string_lossy().into_owned());
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalPolicy,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.embedding.validate()?;
        self.chunking.validate()?;
        self.retrieval.validate()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderStrategy {
    /// Local transformer model; degrades to fallback on load failure.
    Semantic,
    /// Deterministic hash-seeded vectors, no model required.
    #[default]
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub strategy: EmbedderStrategy,
    /// Directory holding `tokenizer.json`, `config.json` and the weights.
    pub model_dir: Option<String>,
    /// When false, a semantic load failure surfaces as `EmbedderUnavailable`.
    pub allow_fallback: bool,
    /// Memoized vectors kept in memory; 0 disables the cache.
    pub cache_capacity: usize,
    /// Token budget per input for the semantic model.
    pub max_tokens: usize,
    pub prefer_gpu: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            strategy: EmbedderStrategy::Fallback,
            model_dir: None,
            allow_fallback: true,
            cache_capacity: 1024,
            max_tokens: 256,
            prefer_gpu: false,
        }
    }
}

impl EmbeddingConfig {
    pub fn fallback(dimension: usize) -> Self {
        Self { dimension, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be > 0".into()));
        }
        if self.strategy == EmbedderStrategy::Semantic && self.max_tokens == 0 {
            return Err(Error::InvalidConfig("embedding.max_tokens must be > 0".into()));
        }
        Ok(())
    }
}

/// Caller-side retrieval policy applied on top of index ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalPolicy {
    pub top_k: usize,
    /// Hits scoring below this cosine similarity are discarded.
    pub min_score: Option<f32>,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K, min_score: None }
    }
}

impl RetrievalPolicy {
    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.min_score {
            if !(-1.0..=1.0).contains(&min) {
                return Err(Error::InvalidConfig(format!(
                    "retrieval.min_score must be within [-1, 1], got {min}"
                )));
            }
        }
        Ok(())
    }
}

/// Expand a user-provided path string (`~`, `${VAR}`, `$VAR`) without
/// touching the filesystem.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let with_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}

/// Expand `p` and join it onto `base` unless it is already absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
