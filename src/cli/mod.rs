//! CLI module for the layered repository
//!
//! Provides subcommands for exercising the repository:
//! - `demo`: wires configured sources and caches, then walks every operation

pub mod demo;

use clap::{Parser, Subcommand};

/// Layered repository - policy-driven reads and writes across sources and caches
#[derive(Parser)]
#[command(name = "layered-repo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a read, write, cache-check and delete walkthrough and print a JSON report
    Demo(demo::DemoArgs),
}
