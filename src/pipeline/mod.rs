//! I/O stages of the extraction pipeline.
//!
//! The routing logic ([`crate::classify`], [`crate::plan`], [`crate::merge`])
//! is pure; everything that touches files, pdfium or the network lives here.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ parse
//! (URL/path)  (pdfium)  (base64)  (VLM)   (JSON)
//! ```
//!
//! 1. [`input`]: canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]: rasterise selected pages and read their text layer; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]: PNG-encode and base64-wrap each page image
//! 4. [`llm`]: VLM calls with timeout, retry and backoff
//! 5. [`parse`]: turn raw VLM text into field dictionaries

pub mod encode;
pub mod input;
pub mod llm;
pub mod parse;
pub mod render;
