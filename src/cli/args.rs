//! CLI argument definitions using clap derive

use crate::orchestration::EngineKind;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cachepack - Triton kernel cache images
///
/// Packages a Triton JIT compiler cache directory into a labeled,
/// content-only container image.
#[derive(Parser, Debug)]
#[command(name = "cachepack")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CACHEPACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format (overrides general.log_format)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a cache image from a Triton cache directory
    Build(BuildArgs),

    /// Summarize a cache directory without building
    Inspect(InspectArgs),

    /// Decode the cache labels of a built image
    Labels(LabelsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Triton cache directory to package
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Image name, optionally with a tag
    #[arg(short, long)]
    pub image: String,

    /// Build engine (overrides engine.kind)
    #[arg(short, long, value_enum)]
    pub engine: Option<EngineKind>,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Triton cache directory to summarize
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the labels command
#[derive(Parser, Debug)]
pub struct LabelsArgs {
    /// Image reference to read
    #[arg(short, long)]
    pub image: String,

    /// Build engine (overrides engine.kind)
    #[arg(short, long, value_enum)]
    pub engine: Option<EngineKind>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for inspect and labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse the `general.log_format` config value, defaulting to text
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn about_comes_from_doc_comment() {
        let about = Cli::command().get_about().map(|a| a.to_string());
        assert_eq!(about.as_deref(), Some("cachepack - Triton kernel cache images"));
    }

    #[test]
    fn parse_build() {
        let cli = Cli::parse_from([
            "cachepack",
            "build",
            "--dir",
            "/home/me/.triton/cache",
            "--image",
            "quay.io/me/kernels:v1",
            "--engine",
            "docker",
        ]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.dir, PathBuf::from("/home/me/.triton/cache"));
                assert_eq!(args.image, "quay.io/me/kernels:v1");
                assert_eq!(args.engine, Some(EngineKind::Docker));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn build_requires_dir_and_image() {
        assert!(Cli::try_parse_from(["cachepack", "build", "--dir", "/tmp"]).is_err());
        assert!(Cli::try_parse_from(["cachepack", "build", "--image", "x"]).is_err());
    }

    #[test]
    fn parse_inspect_defaults_to_table() {
        let cli = Cli::parse_from(["cachepack", "inspect", "-d", "/cache"]);
        match cli.command {
            Commands::Inspect(args) => assert_eq!(args.format, OutputFormat::Table),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["cachepack", "config", "path", "-vv", "--log-format", "json"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn log_format_from_config() {
        assert_eq!(LogFormat::from_config("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_config("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_config("pretty"), LogFormat::Text);
    }
}
