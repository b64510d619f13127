//! Tract-based local embedding pipeline (fallback for musl and Intel Mac).
//!
//! Pure-Rust path: loads ONNX model with tract-onnx and tokenizes with the tokenizers crate.
//! No ONNX Runtime or system deps.
#![cfg_attr(
    all(feature = "local-embeddings-fastembed", feature = "local-embeddings-tract"),
    allow(dead_code)
)]

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tract_onnx::prelude::*;

const ALL_MINILM_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";
const ALL_MINILM_DIMS: usize = 384;
/// Tokens per text fed to the encoder.
const MAX_SEQ_LEN: usize = 256;

/// Files of a supported model inside its Hugging Face repository.
struct ModelFiles {
    repo: &'static str,
    onnx: &'static str,
    tokenizer: &'static str,
    dims: usize,
}

fn model_files(model_name: &str) -> Result<ModelFiles> {
    match model_name {
        "all-minilm-l6-v2" => Ok(ModelFiles {
            repo: ALL_MINILM_REPO,
            onnx: "onnx/model.onnx",
            tokenizer: "tokenizer.json",
            dims: ALL_MINILM_DIMS,
        }),
        _ => bail!(
            "Tract backend supports only all-minilm-l6-v2 for now. Requested: '{}'",
            model_name
        ),
    }
}

/// `$XDG_CACHE_HOME/digest-bench/models`, else `~/.cache/digest-bench/models`.
fn cache_dir() -> Result<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(std::env::var_os("HOME").unwrap_or_else(|| ".".into())).join(".cache")
        });
    let dir = base.join("digest-bench").join("models");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Create cache dir {}", dir.display()))?;
    Ok(dir)
}

fn fetch_into_cache(repo: &str, file: &str, target: &Path) -> Result<()> {
    if target.exists() {
        return Ok(());
    }
    let url = format!(
        "https://huggingface.co/{}/resolve/main/{}",
        repo,
        file.replace(' ', "%20")
    );
    tracing::info!(%url, "downloading embedding model file");
    let bytes = reqwest::blocking::get(&url)
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .with_context(|| format!("Download {}", url))?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, &bytes).with_context(|| format!("Write {}", target.display()))?;
    Ok(())
}

/// Embed `texts` with the tract backend. Blocking; downloads the model on first use.
pub fn embed_local_tract(
    model_name: &str,
    batch_size: usize,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let files = model_files(model_name)?;
    let model_dir = cache_dir()?.join(model_name);
    let onnx_path = model_dir.join(files.onnx);
    let tokenizer_path = model_dir.join(files.tokenizer);
    fetch_into_cache(files.repo, files.onnx, &onnx_path)?;
    fetch_into_cache(files.repo, files.tokenizer, &tokenizer_path)?;

    let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Load tokenizer: {}", e))?;
    let model = tract_onnx::onnx()
        .model_for_path(&onnx_path)
        .and_then(|m| m.into_optimized())
        .and_then(|m| m.into_runnable())
        .map_err(|e| anyhow!("Load ONNX model {}: {}", onnx_path.display(), e))?;

    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let encoded = encode_batch(&tokenizer, batch)?;
        let outputs = model.run(tvec!(
            encoded.input_ids.into_tensor().into(),
            encoded.attention_mask.into_tensor().into()
        ))?;
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No output tensor"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| anyhow!("Output to array: {}", e))?;
        embeddings.extend(pool(&view, &encoded.lengths, files.dims)?);
    }

    Ok(embeddings)
}

struct EncodedBatch {
    input_ids: ndarray::Array2<i64>,
    attention_mask: ndarray::Array2<i64>,
    /// Unpadded token count per text.
    lengths: Vec<usize>,
}

fn encode_batch(tokenizer: &tokenizers::Tokenizer, texts: &[String]) -> Result<EncodedBatch> {
    let encodings = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow!("Tokenize: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let lengths: Vec<usize> = encodings
        .iter()
        .map(|e| e.get_ids().len().min(MAX_SEQ_LEN))
        .collect();
    let width = lengths.iter().copied().max().unwrap_or(1).max(1);

    let mut input_ids = ndarray::Array2::<i64>::zeros((texts.len(), width));
    let mut attention_mask = ndarray::Array2::<i64>::zeros((texts.len(), width));
    for (row, encoding) in encodings.iter().enumerate() {
        for (col, &id) in encoding.get_ids().iter().take(lengths[row]).enumerate() {
            input_ids[[row, col]] = id as i64;
            attention_mask[[row, col]] = 1;
        }
    }

    Ok(EncodedBatch {
        input_ids,
        attention_mask,
        lengths,
    })
}

/// Turn encoder output into one unit vector per text.
///
/// `[batch, dims]` rows are used as-is; `[batch, seq_len, dims]` is
/// mean-pooled over each text's unpadded tokens.
fn pool(view: &ndarray::ArrayViewD<f32>, lengths: &[usize], dims: usize) -> Result<Vec<Vec<f32>>> {
    let shape = view.shape().to_vec();
    match shape.len() {
        2 => Ok((0..shape[0])
            .map(|i| normalize_l2(view.slice(ndarray::s![i, ..]).iter().copied().collect()))
            .collect()),
        3 => Ok(lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                let len = len.min(shape[1]);
                let mut mean = vec![0f32; dims];
                for j in 0..len {
                    for (k, &v) in view.slice(ndarray::s![i, j, ..]).iter().take(dims).enumerate() {
                        mean[k] += v;
                    }
                }
                if len > 0 {
                    mean.iter_mut().for_each(|x| *x /= len as f32);
                }
                normalize_l2(mean)
            })
            .collect()),
        _ => bail!("Unexpected output shape: {:?}", shape),
    }
}

fn normalize_l2(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}
