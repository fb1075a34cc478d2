//! CLI for jarlock.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jarlock_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_status, run_update, run_verify};

/// Top-level CLI for jarlock.
#[derive(Debug, Parser)]
#[command(name = "jarlock")]
#[command(about = "jarlock: keep build lock files with SHA-256 pins up to date", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/jarlock/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Defaults to `update` for every configured source.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch builds missing from the lock files and record their hashes.
    Update {
        /// Only update this source (repeatable). Default: all configured sources.
        #[arg(long = "source", value_name = "NAME")]
        sources: Vec<String>,
        /// Maximum concurrent fetches (overrides `max_concurrent` from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Lock file to use; requires exactly one --source.
        #[arg(long, value_name = "PATH")]
        lock: Option<PathBuf>,
    },

    /// Show what each lock file currently records.
    Status {
        /// Only show this source (repeatable).
        #[arg(long = "source", value_name = "NAME")]
        sources: Vec<String>,
    },

    /// Check a local file against the hash recorded for a build.
    Verify {
        /// Source whose lock file to consult.
        #[arg(long)]
        source: String,
        version: String,
        build: String,
        /// Path to the downloaded artifact.
        path: PathBuf,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_or_init_at(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);
        let work_dir = std::env::current_dir()?;

        match cli.command {
            None => run_update(&cfg, &work_dir, &[], None, None).await?,
            Some(CliCommand::Update {
                sources,
                jobs,
                lock,
            }) => run_update(&cfg, &work_dir, &sources, jobs, lock.as_deref()).await?,
            Some(CliCommand::Status { sources }) => run_status(&cfg, &work_dir, &sources)?,
            Some(CliCommand::Verify {
                source,
                version,
                build,
                path,
            }) => run_verify(&cfg, &work_dir, &source, &version, &build, &path)?,
            Some(CliCommand::Checksum { path }) => run_checksum(&path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
