//! UI module for consistent CLI output
//!
//! Uses `cliclack` for styled output in interactive terminals with
//! automatic fallback to plain lines in CI, where build logs are scraped.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{build_line, intro, key_value, outro_success, step_ok, step_warn_hint};
pub use progress::TaskSpinner;
pub use theme::{init_theme, CachepackTheme};
