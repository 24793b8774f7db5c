//! CLI for downtraffic.

mod commands;
mod render;
mod signals;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use commands::{run_completions, run_engine, run_iface, run_man, run_sources};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "downtraffic", version)]
#[command(
    about = "downtraffic: generate inbound traffic by downloading and discarding public test files",
    long_about = None
)]
pub struct Cli {
    /// Log to stderr instead of ~/.local/state/downtraffic/downtraffic.log.
    #[arg(long, global = true)]
    pub log_stderr: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Start downloading until the duration, byte limit or parity is reached (or Ctrl-C).
    Run(RunArgs),

    /// Show counters and the parity gap for a network interface.
    Iface {
        /// Interface name (default: auto-detect).
        name: Option<String>,

        /// Extra bytes to download beyond transmitted (e.g. 10G).
        #[arg(long, default_value = "0", value_name = "SIZE")]
        offset: String,
    },

    /// Print the effective download URL list.
    Sources {
        /// URL list file (one URL per line, # comments).
        #[arg(short = 'f', long = "url-file", value_name = "FILE")]
        url_file: Option<PathBuf>,
    },

    /// Generate shell completions on stdout.
    Completions {
        shell: Shell,
    },

    /// Print the man page (roff) on stdout.
    Man,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Number of concurrent download workers (default: config, 4).
    #[arg(short = 't', long = "threads", value_name = "N")]
    pub workers: Option<usize>,

    /// Stop after this long: 30s, 10m, 2h, 1d, 1h30m. 0 = unlimited.
    #[arg(short = 'd', long, default_value = "0", value_name = "DURATION")]
    pub duration: String,

    /// Stop after this many bytes: 500M, 10G, 1.5T. 0 = unlimited.
    #[arg(short = 'l', long, default_value = "0", value_name = "SIZE")]
    pub limit: String,

    /// URL list file (one URL per line, # comments).
    #[arg(short = 'f', long = "url-file", value_name = "FILE")]
    pub url_file: Option<PathBuf>,

    /// Parity mode: download until received bytes catch up with transmitted bytes.
    #[arg(short = 'b', long)]
    pub balance: bool,

    /// Interface for parity mode (default: config, then auto-detect).
    #[arg(short = 'i', long, value_name = "IFACE")]
    pub interface: Option<String>,

    /// Parity mode: extra bytes to download beyond transmitted.
    #[arg(long, default_value = "0", value_name = "SIZE")]
    pub offset: String,

    /// Suppress the banner and the progress line.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            CliCommand::Run(args) => run_engine(args).await?,
            CliCommand::Iface { name, offset } => run_iface(name.as_deref(), &offset)?,
            CliCommand::Sources { url_file } => run_sources(url_file)?,
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
