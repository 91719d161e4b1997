use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ckpt",
    about = "Snapshot, inspect and restore a working directory",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the checkpoint stores
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Workspace to operate on
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save a checkpoint of the workspace
    Save(SaveArgs),
    /// Show checkpoint history
    Log(LogArgs),
    /// Print the current checkpoint id
    Head,
    /// Show changes since the current checkpoint
    Status,
    /// List files changed by a checkpoint
    Changed(ChangedArgs),
    /// Show how a checkpoint changed one file
    Diff(DiffArgs),
    /// Restore the whole workspace to a checkpoint
    Reset(ResetArgs),
    /// Restore one file from a checkpoint
    Rollback(RollbackArgs),
    /// List workspaces that have checkpoint stores
    Workspaces(WorkspacesArgs),
    /// Delete the checkpoint store of the workspace
    Drop,
    /// Delete checkpoint stores of workspaces that no longer exist
    Prune,
}

#[derive(Args)]
pub struct SaveArgs {
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ChangedArgs {
    /// Checkpoint id (defaults to the current checkpoint)
    pub commit: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub commit: String,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ResetArgs {
    pub commit: String,
}

#[derive(Args)]
pub struct RollbackArgs {
    pub commit: String,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct WorkspacesArgs {
    /// Only workspaces with an open handle in this process
    #[arg(long)]
    pub cached: bool,
}
