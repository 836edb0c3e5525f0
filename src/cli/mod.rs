//! CLI module
//!
//! This module defines the command-line interface using clap and implements
//! the command execution logic.

use crate::state_machine::State;
use crate::{Config, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
pub mod output;

/// NAADSM trace to event log decoder CLI
#[derive(Parser, Debug)]
#[command(name = "naadsm-events")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Transition catalog file (overrides config)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Reject cyclic catalogs instead of truncating back edges
    #[arg(long, global = true)]
    pub strict_cycles: bool,

    /// Log level (overrides config; RUST_LOG takes precedence)
    #[arg(long, global = true, env = "NAADSM_EVENTS_LOG")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode every run of a trace into transition events
    Decode {
        /// Trace file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Initial state per unit, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with = "guess_initial")]
        initial: Option<Vec<State>>,

        /// Infer the initial state from the first day of every run
        #[arg(long)]
        guess_initial: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Infer a consistent initial state from the first day of every run
    InferInitial {
        /// Trace file to read
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the compiled transition graph
    Graph {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: GraphFormat,
    },

    /// Count the state changes observed in a trace
    Observed {
        /// Trace file to read
        #[arg(short, long)]
        input: PathBuf,

        /// Initial state per unit, comma separated
        #[arg(long, value_delimiter = ',')]
        initial: Option<Vec<State>>,
    },
}

/// Event output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON document with every run
    Json,
    /// One JSON event per line
    Jsonl,
    /// Plain text table
    Table,
}

/// Graph output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Plain text table of compiled paths
    Table,
    /// DOT format (Graphviz)
    Dot,
}

/// Execute the CLI command
pub fn execute(args: Cli, mut config: Config) -> Result<()> {
    if let Some(catalog) = &args.catalog {
        config.catalog.path = Some(catalog.clone());
    }
    if args.strict_cycles {
        config.catalog.strict_cycles = true;
    }

    match args.command {
        Commands::Decode {
            input,
            initial,
            guess_initial,
            format,
        } => commands::decode::execute(&config, input, initial, guess_initial, format),
        Commands::InferInitial { input } => commands::infer_initial::execute(&config, input),
        Commands::Graph { format } => commands::graph::execute(&config, format),
        Commands::Observed { input, initial } => {
            commands::observed::execute(&config, input, initial)
        }
    }
}
