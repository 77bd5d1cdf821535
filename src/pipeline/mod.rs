//! Pipeline stages for dashboard analysis.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable without the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess
//! (validate) (RGB→JPEG→b64) (Ollama) (cleanup)
//! ```
//!
//! 1. [`input`]  — validate the upload (type, size, signature) or load it
//!    from a path / URL
//! 2. [`encode`] — decode, flatten to RGB, cap dimensions, JPEG + base64;
//!    runs in `spawn_blocking`
//! 3. [`llm`]    — one chat call with the instruction and image; the only
//!    stage with network I/O
//! 4. [`postprocess`] — deterministic text cleanup of the answer

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
