use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::types::{OutputFormat, OutputMode};

#[derive(Parser, Debug)]
#[command(
    name = "url-radar",
    version,
    about = "Concurrent phishing and malware signal checks for URLs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML). Default: config/url-radar.toml
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Skip every check that needs the network; no redirect resolution
    #[arg(long, global = true)]
    pub no_network: bool,

    /// Increase verbosity (debug, trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log file path
    #[arg(long, global = true, default_value = "data/url-radar.log")]
    pub log_file: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Assess a single URL and print the assessment as JSON
    Assess {
        url: String,
        #[arg(long, value_enum, default_value = "verdict")]
        mode: ModeArg,
    },
    /// Assess every URL in a file (one per line, optionally `url,label`)
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value = "jsonl")]
        format: OutputFormatArg,
        #[arg(long, value_enum, default_value = "features")]
        mode: ModeArg,
    },
    /// List registered checks in registry order
    Checks,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Verdict,
    Features,
}

impl From<ModeArg> for OutputMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Verdict => OutputMode::Verdict,
            ModeArg::Features => OutputMode::Features,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormatArg {
    Jsonl,
    Csv,
    Md,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Jsonl => OutputFormat::Jsonl,
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Md => OutputFormat::Markdown,
        }
    }
}
