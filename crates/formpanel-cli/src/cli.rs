//! CLI definitions for formpanel.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "formpanel",
    version,
    about = "Validate CMS form schemas and report panel status",
    after_help = "Examples:\n  formpanel check --schema ldap.json --values ldap-values.json\n  formpanel check --schema ldap.xml --run-checkers --endpoint http://cms/test\n  formpanel toc --schema ldap.json"
)]
pub struct Cli {
    /// Options file with `[form]` and `[endpoint]` tables.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a form, validate it and print the status of every panel.
    Check {
        /// Schema file (.json or .xml).
        #[arg(long)]
        schema: PathBuf,
        /// Values payload (.json or .xml).
        #[arg(long)]
        values: Option<PathBuf>,
        /// Test endpoint URL (overrides the config file).
        #[arg(long)]
        endpoint: Option<String>,
        /// Run every field checker against the test endpoint.
        #[arg(long)]
        run_checkers: bool,
        /// Report format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the table of contents of the linear layout.
    Toc {
        /// Schema file (.json or .xml).
        #[arg(long)]
        schema: PathBuf,
        /// Values payload (.json or .xml).
        #[arg(long)]
        values: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}
