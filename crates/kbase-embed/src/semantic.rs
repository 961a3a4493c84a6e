//! Model-backed embedder that degrades to the fallback strategy.
//!
//! The model is loaded lazily on first use and shared process-wide per
//! `(model_dir, max_tokens, prefer_gpu)`. A load failure is remembered for
//! the lifetime of the embedder; every later call goes straight to the fallback (or fails with
//! `EmbedderUnavailable` when fallback is disabled).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use kbase_core::config::EmbeddingConfig;
use kbase_core::error::{Error, Result};
use kbase_core::traits::{Embedded, Embedder};
use kbase_core::types::non_empty_trimmed;

use crate::device::select_device;
use crate::fallback::FallbackEmbedder;
use crate::model::SentenceModel;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ModelKey {
    dir: PathBuf,
    max_tokens: usize,
    prefer_gpu: bool,
}

static LOADED_MODELS: OnceLock<Mutex<HashMap<ModelKey, Arc<SentenceModel>>>> = OnceLock::new();

pub struct SemanticEmbedder {
    model_dir: Option<PathBuf>,
    dim: usize,
    max_tokens: usize,
    prefer_gpu: bool,
    fallback: Option<FallbackEmbedder>,
    model: OnceLock<std::result::Result<Arc<SentenceModel>, String>>,
    id: String,
}

impl SemanticEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        config.validate()?;
        let model_dir = config.model_dir.as_ref().map(PathBuf::from);
        if model_dir.is_none() && !config.allow_fallback {
            return Err(Error::EmbedderUnavailable("embedding.model_dir is not set".into()));
        }
        let fallback = if config.allow_fallback {
            Some(FallbackEmbedder::new(config.dimension)?)
        } else {
            None
        };
        let name = model_dir
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "none".to_string());
        Ok(Self {
            model_dir,
            dim: config.dimension,
            max_tokens: config.max_tokens,
            prefer_gpu: config.prefer_gpu,
            fallback,
            model: OnceLock::new(),
            id: format!("semantic:{}:d{}", name, config.dimension),
        })
    }

    /// Load the model now instead of on first `embed`. Returns whether the
    /// semantic model is usable.
    pub fn warm_up(&self) -> bool {
        self.model().is_ok()
    }

    /// True once a load attempt failed and calls are served by the fallback.
    pub fn is_degraded(&self) -> bool {
        matches!(self.model.get(), Some(Err(_)))
    }

    fn model(&self) -> &std::result::Result<Arc<SentenceModel>, String> {
        self.model.get_or_init(|| {
            let loaded = self.load().map_err(|e| format!("{e:#}"));
            if let Err(reason) = &loaded {
                if self.fallback.is_some() {
                    tracing::warn!(
                        %reason,
                        "semantic embedder unavailable, using fallback vectors"
                    );
                } else {
                    tracing::error!(%reason, "semantic embedder unavailable and fallback disabled");
                }
            }
            loaded
        })
    }

    fn load(&self) -> anyhow::Result<Arc<SentenceModel>> {
        let dir = self
            .model_dir
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("embedding.model_dir is not set"))?;
        let key = ModelKey {
            dir: dir.clone(),
            max_tokens: self.max_tokens,
            prefer_gpu: self.prefer_gpu,
        };
        let models = LOADED_MODELS.get_or_init(|| Mutex::new(HashMap::new()));
        let mut models = models.lock().unwrap_or_else(PoisonError::into_inner);
        let model = match models.get(&key) {
            Some(model) => Arc::clone(model),
            None => {
                let device = select_device(self.prefer_gpu);
                let model = Arc::new(SentenceModel::load(dir, device, self.max_tokens)?);
                models.insert(key, Arc::clone(&model));
                model
            }
        };
        if model.dim() != self.dim {
            anyhow::bail!(
                "model at {} produces {}-dimensional vectors but embedding.dimension is {}",
                dir.display(),
                model.dim(),
                self.dim
            );
        }
        Ok(model)
    }

    fn degrade(&self, text: &str, reason: &str) -> Result<Embedded> {
        match &self.fallback {
            Some(fallback) => Ok(Embedded { vector: fallback.vector_for(text), degraded: true }),
            None => Err(Error::EmbedderUnavailable(reason.to_string())),
        }
    }
}

impl Embedder for SemanticEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_checked(text).map(|e| e.vector)
    }

    fn embed_checked(&self, text: &str) -> Result<Embedded> {
        let text = non_empty_trimmed(text)?;
        match self.model() {
            Ok(model) => match model.embed(text) {
                Ok(vector) if vector.len() == self.dim => Ok(Embedded { vector, degraded: false }),
                Ok(v) => {
                    let reason =
                        format!("model returned {} values, expected {}", v.len(), self.dim);
                    tracing::warn!(%reason, "inference produced wrong dimension");
                    self.degrade(text, &reason)
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    tracing::warn!(%reason, "inference failed");
                    self.degrade(text, &reason)
                }
            },
            Err(reason) => self.degrade(text, reason),
        }
    }
}
