//! cachepack - Triton kernel cache images
//!
//! Packages a Triton JIT compiler cache directory into a content-only
//! container image, with a JSON manifest of every compiled kernel and
//! labels summarizing the cache by backend and architecture.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod image;
pub mod orchestration;
pub mod ui;

pub use error::{CachepackError, CachepackResult};
