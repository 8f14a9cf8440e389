//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quill")]
#[command(author, version, about = "Run feature modules against sandboxed Lua configuration", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Settings file (defaults to ./quill.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Directory holding feature modules
    #[arg(long, global = true, env = "QUILL_LIB_DIR", value_name = "DIR")]
    pub lib_dir: Option<PathBuf>,

    /// Directory holding configuration files
    #[arg(long, global = true, env = "QUILL_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// Load features and configuration, then run a feature
    Run {
        /// Name of the feature to run
        feature: String,

        /// Arguments passed to the feature's entry
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List discoverable features
    List,

    /// Load every feature and evaluate the configuration without running anything
    Check,
}
