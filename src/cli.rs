//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for seqlink using clap's derive macros.

use clap::{Parser, Subcommand};

/// seqlink - sequence-backed URL shortener core
#[derive(Parser)]
#[command(name = "seqlink")]
#[command(version)]
#[command(about = "Convert long URLs into short base62 tokens and back", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Convert a long URL into a short token
    Convert {
        /// Long URL (http or https)
        long_url: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a token back to its long URL
    Resolve {
        /// Token to resolve
        token: String,
    },

    /// Encode an id with the configured alphabet (no storage access)
    Encode {
        id: u64,
    },

    /// Decode a token with the configured alphabet (no storage access)
    Decode {
        token: String,
    },

    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        #[arg(long, short = 'o')]
        output_path: Option<String>,
    },

    /// Print a freshly shuffled alphabet for codec.alphabet
    GenerateAlphabet,
}

impl Commands {
    /// 是否需要连接数据库
    pub fn needs_storage(&self) -> bool {
        matches!(self, Commands::Convert { .. } | Commands::Resolve { .. })
    }
}
