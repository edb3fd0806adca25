//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Each subcommand corresponds to a distinct operation: rewriting imports for
//! a moved project, printing the root alias table, or listing scan targets.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rewrite import aliases and tsconfig path mappings when a project moves.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Log progress to stderr (repeat for more detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rewrite references to a moved project and re-base its path mapping.
    UpdateImports {
        /// Workspace root. Defaults to current directory.
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Name of the project being moved.
        #[arg(long)]
        project: String,

        /// New project root, relative to the workspace root.
        #[arg(short, long)]
        destination: String,

        /// New import alias. Defaults to `@<scope>/<destination without libs dir>`.
        #[arg(long)]
        import_path: Option<String>,

        /// Keep the current alias; only re-base its path mapping.
        #[arg(long, conflicts_with = "import_path")]
        keep_import_path: bool,

        /// Replace every occurrence of the alias inside a matched specifier,
        /// not just the leading one.
        #[arg(long)]
        replace_everywhere: bool,

        /// Glob patterns for directories/files to exclude (e.g., "dist", "*.generated.ts").
        /// By default, entries starting with `.` and `node_modules` are excluded.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable default exclusion of `.` prefixed entries and `node_modules`.
        #[arg(long)]
        no_default_excludes: bool,

        /// Actually modify files (default is dry-run).
        #[arg(long)]
        write: bool,

        /// Confirm the changes interactively before writing.
        #[arg(short, long, conflicts_with = "json")]
        interactive: bool,

        /// Emit the report as JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Print the root tsconfig alias table.
    Aliases {
        /// Workspace root. Defaults to current directory.
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },

    /// List files that would be scanned for a moved project without processing them.
    Scan {
        /// Workspace root. Defaults to current directory.
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Name of the project being moved.
        #[arg(long)]
        project: String,

        /// Glob patterns for directories/files to exclude.
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Disable default exclusion of `.` prefixed entries and `node_modules`.
        #[arg(long)]
        no_default_excludes: bool,
    },
}
