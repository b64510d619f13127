//! # Digest Bench
//!
//! Local-first PDF summarization with a model benchmarking harness.
//!
//! A document is turned into per-page text (with an optional OCR fallback
//! for image-only pages), summarized by a model served from a local Ollama
//! instance, and, when several models are compared, each summary is scored
//! against a reference for runtime, memory, token throughput, ROUGE, and an
//! embedding-based semantic F1. Results land in a CSV table.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌───────────┐   ┌──────────┐
//! │ extract  │──▶│ summarize  │──▶│  harness  │──▶│  store   │
//! │ PDF+OCR  │   │  Ollama    │   │ ROUGE+emb │   │   CSV    │
//! └──────────┘   └────────────┘   └───────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! digest extract paper.pdf --ocr
//! digest summarize paper.pdf --model llama3.2:1b
//! digest evaluate --document paper.pdf --models llama3.2:1b,qwen2.5:0.5b
//! digest results
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and request options |
//! | [`error`] | Pipeline error taxonomy |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-page text extraction with OCR fallback |
//! | [`ocr`] | Page rasterization and recognition |
//! | [`ollama`] | Inference service client |
//! | [`summarize`] | Prompt, reply parsing, throughput |
//! | [`rouge`] | ROUGE-1/2/L |
//! | [`embedding`] | Embedding providers |
//! | [`scoring`] | Summary quality scores |
//! | [`memory`] | Host memory snapshots |
//! | [`harness`] | Multi-model evaluation |
//! | [`store`] | Result table CSV persistence |
//! | [`context`] | Run context |
//! | [`pipeline`] | End-to-end evaluation |
//! | [`progress`] | stderr progress reporting |
//! | [`report`] | Result table printing |

pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod harness;
pub mod memory;
pub mod models;
pub mod ocr;
pub mod ollama;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod rouge;
pub mod scoring;
pub mod store;
pub mod summarize;
