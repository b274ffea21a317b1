//! CLI command implementations

pub mod build;
pub mod config;
pub mod inspect;
pub mod labels;

pub use build::execute as build;
pub use config::execute as config;
pub use inspect::execute as inspect;
pub use labels::execute as labels;
