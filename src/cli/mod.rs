//! CLI module for the research analyst
//!
//! Provides command-line parsing for the `analyst` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::types::{DataSource, ReportVariant};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Research analyst - plans, gathers and writes research reports
#[derive(Parser, Debug)]
#[command(
    name = "analyst",
    version,
    about = "Research analyst - automated research reports",
    long_about = "Plans sub-queries for a topic, gathers evidence from the web, a local\n\
                  document corpus or a fixed URL list, compresses it to the relevant\n\
                  passages, and writes a structured Markdown report.",
    after_help = "EXAMPLES:\n    \
                  analyst research \"latest burning man floods\"\n    \
                  analyst research \"gut microbiome and sleep\" --report detailed --source local\n    \
                  analyst research \"rust async runtimes\" --source urls --url https://tokio.rs\n    \
                  analyst research --resume state.json --report detailed\n    \
                  analyst prompts\n    \
                  analyst config --validate"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "analyst.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and write a report
    Research {
        /// The question or topic to research
        #[arg(required_unless_present = "resume")]
        topic: Option<String>,

        /// Report variant: summary, detailed, outline, resource, subtopic
        /// [default: summary, or the saved variant with --resume]
        #[arg(short, long)]
        report: Option<ReportVariant>,

        /// Evidence source: web, local, urls
        #[arg(short, long, default_value = "web")]
        source: DataSource,

        /// URL to research (with --source urls); repeatable
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Write the final research state to this file
        #[arg(long, value_name = "FILE")]
        save_state: Option<PathBuf>,

        /// Continue from a saved research state
        #[arg(long, value_name = "FILE")]
        resume: Option<PathBuf>,

        /// Do not write the report to the output directory
        #[arg(long)]
        no_publish: bool,
    },

    /// List the prompt catalog with each prompt's variables
    Prompts,

    /// Show configuration information
    Config {
        /// Only validate the configuration
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
