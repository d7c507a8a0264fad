//! Defines the command-line arguments and subcommands for `wqb-validate`.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "wqb-validate",
    version,
    about = "Validate alpha expressions against operator and data-field catalogs."
)]
pub struct ValidatorArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings overrides shared by every subcommand.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// YAML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the operator and field catalogs.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Market region, e.g. USA.
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Data delay, e.g. 1.
    #[arg(long, global = true)]
    pub delay: Option<String>,

    /// Stock universe, e.g. TOP3000.
    #[arg(long, global = true)]
    pub universe: Option<String>,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate one expression given inline, in a file, or on stdin.
    Check {
        /// The expression text. Reads stdin when neither this nor --file is given.
        #[arg(conflicts_with = "file")]
        expression: Option<String>,

        /// Read the expression from a file.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate every blank-line separated expression in a file or directory.
    Batch {
        /// A file, or a directory searched for .alpha, .expr and .txt files.
        #[arg(required = true)]
        path: PathBuf,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the available market combinations.
    Keys,
    /// List the data fields of the selected market combination.
    Fields,
}
