//! Pipeline stages for one request.
//!
//! Each submodule implements exactly one step; none of them keeps state
//! between requests.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ llm ──▶ postprocess
//! (data URI /   (model   (fence strip,
//!  raw bytes)    call)    JSON parse)
//! ```
//!
//! 1. [`normalize`]   — validate a data URI or base64-encode uploaded bytes
//! 2. [`llm`]         — build the chat-completion request and call the model;
//!    the only stage with network I/O
//! 3. [`postprocess`] — strip code fences, parse JSON or trim the transcription

pub mod llm;
pub mod normalize;
pub mod postprocess;
