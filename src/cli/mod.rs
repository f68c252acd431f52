//! CLI module - Command-line interface for SmartAsset
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// SmartAsset - asset inventory and maintenance tracking
#[derive(Parser)]
#[command(name = "smartasset")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web API and, when enabled, the due-summary scheduler
    #[command(alias = "daemon", alias = "-d", alias = "--daemon")]
    Serve,

    /// Build today's due-maintenance summary once and print it
    #[command(alias = "due")]
    DueSummary {
        /// Print the summary as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create or refresh demo users, assets and a sample log
    Seed,
}

pub use commands::*;
