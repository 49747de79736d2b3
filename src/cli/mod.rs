//! CLI definitions and command implementations for the contingency bot.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Contingency bot - Drive transfers and extract tooling
#[derive(Parser)]
#[command(name = "contingency")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/contingency/contingency.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Obtain or refresh Google Drive credentials and cache them
    Auth,

    /// Download a file from Drive (spreadsheets are exported as XLSX)
    Download {
        /// Drive file id (default: download.file_id)
        file_id: Option<String>,

        /// Target file or directory
        #[arg(short, long)]
        destination: Option<PathBuf>,
    },

    /// Upload a local file as a new Drive file
    Upload {
        /// Local file (default: upload.local_path)
        local_path: Option<PathBuf>,

        /// Name on Drive (default: the local file name)
        #[arg(short, long)]
        name: Option<String>,

        /// Parent folder id
        #[arg(short, long)]
        parent: Option<String>,

        /// Shared drive the folder belongs to
        #[arg(long)]
        shared_drive: Option<String>,
    },

    /// Replace the content of an existing Drive file
    Overwrite {
        /// Local file (default: upload.local_path)
        local_path: Option<PathBuf>,

        /// Drive file id (default: upload.file_id)
        file_id: Option<String>,
    },

    /// Mask, sort and write the contingency extract
    Transform {
        /// CSV extract (default: transform.input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// XLSX or CSV output (default: transform.output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the obligations of a customer by identification number
    Lookup {
        id: String,

        /// Sorted CSV extract (default: lookup.file)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Suggest identification numbers starting with a fragment
    Suggest {
        fragment: String,

        /// Maximum number of suggestions
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Sorted CSV extract (default: lookup.file)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Manage the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}
