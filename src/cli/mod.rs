//! CLI command handlers
//!
//! Each subcommand lives in its own module. Handlers receive an open
//! [`MemoryManager`](deepcli_memory::MemoryManager) and the selected output
//! format; the entry point owns opening and closing the store.

pub mod config;
pub mod export;
pub mod forget;
pub mod helpers;
pub mod import;
pub mod namespaces;
pub mod recall;
pub mod search;
pub mod session;
pub mod stats;
pub mod store;
pub mod sweep;

use clap::ValueEnum;

/// Output format shared by every command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,

    /// One JSON document on stdout
    Json,
}
