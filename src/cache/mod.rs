//! Triton cache format support
//!
//! A Triton cache directory holds one subdirectory per compiled kernel,
//! named by its content hash:
//!
//! | File | Role |
//! |------|------|
//! | `<kernel>.json` | Descriptor: target, tuning parameters, hash |
//! | `__grp__<kernel>.json` | Group file: artifact name to host path map |
//! | `<kernel>.cubin`, `.ptx`, `.hsaco`, ... | Compiled artifacts |
//!
//! Only descriptors feed the manifest. Group files are redacted so the
//! packaged tree does not depend on the host it was built on.

pub mod descriptor;
pub mod group;

pub use descriptor::{ArchCode, CacheFields, CacheParser, CacheTarget, TritonCacheParser};
pub use group::{is_group_file, GroupRedactor, TritonGroupRedactor};
