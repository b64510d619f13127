//! Sentence embeddings for the semantic similarity score.
//!
//! Two backends sit behind [`EmbeddingProvider`]:
//!
//! - [`OllamaProvider`] posts to `/api/embed` on an Ollama server, for
//!   example with `nomic-embed-text`.
//! - `LocalProvider` runs a small model in-process. With the default
//!   `local-embeddings-fastembed` feature this is fastembed on ONNX Runtime.
//!   With only `local-embeddings-tract` it is a pure-Rust tract pipeline for
//!   targets where ONNX Runtime binaries are unavailable (musl, Intel macOS).
//!   Weights are fetched from Hugging Face on first use.
//!
//! [`create_provider`] maps `embedding.provider` to one of them, or to
//! `None` for `"disabled"`:
//!
//! ```rust,no_run
//! # use digest_bench::config::EmbeddingConfig;
//! # use digest_bench::embedding::create_provider;
//! let config = EmbeddingConfig {
//!     provider: "disabled".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! assert!(create_provider(&config).unwrap().is_none());
//! ```

#[cfg(feature = "local-embeddings-tract")]
mod local_tract;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::config::EmbeddingConfig;

#[cfg(any(
    feature = "local-embeddings-fastembed",
    feature = "local-embeddings-tract"
))]
const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

/// Turns texts into fixed-size vectors. Blocking, no retries.
pub trait EmbeddingProvider {
    /// Identifier of the model producing the vectors.
    fn model_name(&self) -> &str;

    /// One vector per input, same order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embeddings from an Ollama server.
pub struct OllamaProvider {
    model: String,
    endpoint: String,
    http: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct EmbedReply {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let Some(model) = config.model.clone() else {
            bail!("embedding.model must name an Ollama embedding model");
        };
        let base = config.url.as_deref().unwrap_or("http://localhost:11434");
        // 0 waits forever, same as `ollama.timeout_secs`
        let timeout =
            (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            model,
            endpoint: format!("{}/api/embed", base.trim_end_matches('/')),
            http,
        })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "model": self.model, "input": texts }))
            .send()
            .with_context(|| format!("Ollama embedding request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                "Ollama embedding error {}: {}",
                status,
                response.text().unwrap_or_default()
            );
        }

        let body = response.text()?;
        decode_embed_reply(&body)
    }
}

fn decode_embed_reply(body: &str) -> Result<Vec<Vec<f32>>> {
    let reply: EmbedReply =
        serde_json::from_str(body).context("Unexpected Ollama embedding reply")?;
    Ok(reply.embeddings)
}

/// In-process embeddings (fastembed, or tract without fastembed).
///
/// The fastembed model is built on the first [`embed`](EmbeddingProvider::embed)
/// call and kept for the provider's lifetime.
#[cfg(any(
    feature = "local-embeddings-fastembed",
    feature = "local-embeddings-tract"
))]
pub struct LocalProvider {
    model_name: String,
    batch_size: usize,
    #[cfg(feature = "local-embeddings-fastembed")]
    model: std::sync::Mutex<Option<fastembed::TextEmbedding>>,
}

#[cfg(any(
    feature = "local-embeddings-fastembed",
    feature = "local-embeddings-tract"
))]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .as_deref()
            .unwrap_or(DEFAULT_LOCAL_MODEL)
            .to_string();
        // reject unknown names before any download
        #[cfg(feature = "local-embeddings-fastembed")]
        fastembed_model(&model_name)?;

        Ok(Self {
            model_name,
            batch_size: config.batch_size,
            #[cfg(feature = "local-embeddings-fastembed")]
            model: std::sync::Mutex::new(None),
        })
    }
}

#[cfg(any(
    feature = "local-embeddings-fastembed",
    feature = "local-embeddings-tract"
))]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    #[cfg(feature = "local-embeddings-fastembed")]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut slot = self
            .model
            .lock()
            .map_err(|_| anyhow::anyhow!("embedding model mutex poisoned"))?;

        if slot.is_none() {
            tracing::info!(model = %self.model_name, "loading local embedding model");
            let options = fastembed::InitOptions::new(fastembed_model(&self.model_name)?)
                .with_show_download_progress(false);
            let loaded = fastembed::TextEmbedding::try_new(options).map_err(|e| {
                anyhow::anyhow!("Loading embedding model {} failed: {}", self.model_name, e)
            })?;
            *slot = Some(loaded);
        }
        let Some(model) = slot.as_mut() else {
            bail!("embedding model {} is not loaded", self.model_name);
        };

        model
            .embed(texts.to_vec(), Some(self.batch_size))
            .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
    }

    #[cfg(not(feature = "local-embeddings-fastembed"))]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        local_tract::embed_local_tract(&self.model_name, self.batch_size, texts)
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    use fastembed::EmbeddingModel as M;
    Ok(match name {
        "all-minilm-l6-v2" => M::AllMiniLML6V2,
        "bge-small-en-v1.5" => M::BGESmallENV15,
        "bge-base-en-v1.5" => M::BGEBaseENV15,
        "nomic-embed-text-v1.5" => M::NomicEmbedTextV15,
        "multilingual-e5-small" => M::MultilingualE5Small,
        other => bail!(
            "embedding.model '{}' is not a known local model \
             (all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
             nomic-embed-text-v1.5, multilingual-e5-small)",
            other
        ),
    })
}

/// Build the provider named by `embedding.provider`.
///
/// `"disabled"` yields `Ok(None)` and the semantic score is left empty.
/// `"local"` needs one of the local embedding features.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Option<Box<dyn EmbeddingProvider>>> {
    let provider: Box<dyn EmbeddingProvider> = match config.provider.as_str() {
        "disabled" => return Ok(None),
        "ollama" => Box::new(OllamaProvider::new(config)?),
        #[cfg(any(feature = "local-embeddings-fastembed", feature = "local-embeddings-tract"))]
        "local" => Box::new(LocalProvider::new(config)?),
        #[cfg(not(any(feature = "local-embeddings-fastembed", feature = "local-embeddings-tract")))]
        "local" => bail!(
            "embedding.provider = \"local\" needs the local-embeddings-fastembed \
             or local-embeddings-tract feature"
        ),
        other => bail!("Unknown embedding provider: {}", other),
    };
    Ok(Some(provider))
}

/// Cosine of the angle between `a` and `b`, in `[-1, 1]`.
///
/// 0.0 when the lengths differ or either vector is empty or has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let (dot, aa, bb) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, aa, bb), (x, y)| {
            (dot + x * y, aa + x * x, bb + y * y)
        });
    let norms = aa.sqrt() * bb.sqrt();
    if norms < f32::EPSILON {
        0.0
    } else {
        dot / norms
    }
}
