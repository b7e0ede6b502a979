//! Pipeline stages for image-to-translation.
//!
//! ## Data Flow
//!
//! ```text
//! encode ──▶ llm (extract) ──▶ postprocess ──▶ llm (translate) ──▶ postprocess
//! (base64)   (vision call)     (opt. cleanup)  (text call)         (opt. cleanup)
//! ```
//!
//! 1. [`encode`]: read the image, base64-wrap it, enforce the size ceiling
//! 2. [`llm`]: frame and send chat-completion requests; the only stage
//!    with network I/O
//! 3. [`postprocess`]: opt-in deterministic cleanup of model quirks (fences,
//!    CRLF, invisible characters)
//!
//! Sequencing between the two calls is owned by [`crate::state`] and
//! [`crate::session`], not by these stages.

pub mod encode;
pub mod llm;
pub mod postprocess;
