//! Output generation for a collection run.
//!
//! - [`json`]: writes the ranked [`Digest`](crate::models::Digest) for the
//!   generation and publishing steps that run after collection.

pub mod json;
