use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "human-activities")]
#[command(about = "Measure how your directories grow", long_about = None)]
pub struct Cli {
    /// JSON config file [env: HA_CONFIG_PATH]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Stats cache database [env: HA_CACHE_PATH]
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    /// Ignore-file handed to the external finder
    #[arg(long, global = true)]
    pub ignore_file: Option<PathBuf>,

    /// List files with the external finder (fd) when it is installed
    #[arg(long, global = true)]
    pub external: bool,

    /// More log output (-v debug, -vv trace); TRACING_LEVEL overrides it
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the configured directories once and print the breakdown
    Scan,
    /// Keep rescanning at the configured interval, printing every update
    Watch,
    /// Delete the stats cache
    Clean,
    /// Print configuration values
    PrintConfig,
    /// Add a named directory
    AddDir {
        path: PathBuf,
        /// Display name, defaults to the directory name
        name: Option<String>,
    },
    /// Remove a named directory
    RemoveDir { path: PathBuf },
    /// Print the cached stats of every directory
    ListCache,
}
