use anyhow::Context;
use chrono::{DateTime, Local};
use colored::Colorize;

use ckpt_core::{
    ChangeKind, CheckpointConfig, CheckpointService, CheckpointStore, CommitSummary, ObjectId,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let service = open_service(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Save(args) => cmd_save(&store(&service, &cli.workspace)?, args, format),
        Command::Log(args) => cmd_log(&store(&service, &cli.workspace)?, args, format),
        Command::Head => cmd_head(&store(&service, &cli.workspace)?),
        Command::Status => cmd_status(&store(&service, &cli.workspace)?),
        Command::Changed(args) => cmd_changed(&store(&service, &cli.workspace)?, args, format),
        Command::Diff(args) => cmd_diff(&store(&service, &cli.workspace)?, args),
        Command::Reset(args) => cmd_reset(&store(&service, &cli.workspace)?, args),
        Command::Rollback(args) => cmd_rollback(&store(&service, &cli.workspace)?, args),
        Command::Workspaces(args) => cmd_workspaces(&service, args, format),
        Command::Drop => cmd_drop(&service, &cli.workspace),
        Command::Prune => cmd_prune(&service),
    }
}

fn open_service(cli: &Cli) -> anyhow::Result<CheckpointService> {
    let mut config = match &cli.config {
        Some(path) => CheckpointConfig::load(path)?,
        None => CheckpointConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.stores_root = root.clone();
    }
    tracing::debug!(stores_root = ?config.stores_root, "using stores root");
    CheckpointService::with_config(&config)
        .with_context(|| format!("cannot open stores root {}", config.stores_root.display()))
}

fn store(service: &CheckpointService, workspace: &std::path::Path) -> anyhow::Result<CheckpointStore> {
    anyhow::ensure!(
        workspace.is_dir(),
        "workspace {} is not a directory",
        workspace.display()
    );
    Ok(service.get_store(workspace)?)
}

fn cmd_save(store: &CheckpointStore, args: SaveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let before = store.head().ok();
    let id = store.save(args.message.as_deref())?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string(&store.show(id)?)?);
    } else if before == Some(id) {
        println!("{} Nothing changed, still at {}", "✓".green(), id.short_hex().yellow());
    } else {
        println!("{} Saved checkpoint {}", "✓".green().bold(), id.short_hex().yellow());
        println!("  {}", id.to_string().dimmed());
    }
    Ok(())
}

fn cmd_log(store: &CheckpointStore, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let log = store.log(Some(args.limit))?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&log)?);
        return Ok(());
    }
    if log.is_empty() {
        println!("No checkpoints yet.");
        return Ok(());
    }
    for entry in &log {
        if args.oneline {
            println!("{} {}", entry.id.short_hex().yellow(), entry.message);
        } else {
            print_summary(entry);
        }
    }
    Ok(())
}

fn print_summary(entry: &CommitSummary) {
    println!("{} {}", "checkpoint".yellow(), entry.id.to_string().yellow().bold());
    if let Some(parent) = entry.parent {
        println!("Parent: {}", parent.short_hex().dimmed());
    }
    println!("Date:   {}", format_time(entry.timestamp_ms));
    if !entry.message.is_empty() {
        println!("\n    {}", entry.message);
    }
    println!();
}

fn format_time(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %z").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn cmd_head(store: &CheckpointStore) -> anyhow::Result<()> {
    println!("{}", store.head()?);
    Ok(())
}

fn cmd_status(store: &CheckpointStore) -> anyhow::Result<()> {
    match store.head().ok() {
        Some(head) => println!("At checkpoint {}", head.short_hex().yellow().bold()),
        None => println!("No checkpoints yet."),
    }
    let status = store.status()?;
    if status.is_empty() {
        println!("\nWorking directory clean.");
        return Ok(());
    }
    println!();
    for entry in status {
        let label = match entry.kind {
            ChangeKind::Added => "added:".green(),
            ChangeKind::Deleted => "deleted:".red(),
            ChangeKind::Modified => "modified:".yellow(),
            ChangeKind::ModeChanged => "mode:".cyan(),
        };
        println!("  {label:<10} {}", entry.path);
    }
    Ok(())
}

fn cmd_changed(store: &CheckpointStore, args: ChangedArgs, format: OutputFormat) -> anyhow::Result<()> {
    let files = store.get_changed_files(args.commit.as_deref())?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in files {
            println!("{file}");
        }
    }
    Ok(())
}

fn cmd_diff(store: &CheckpointStore, args: DiffArgs) -> anyhow::Result<()> {
    let patch = store.get_file_diff(args.commit.as_str(), &args.file)?;
    for line in patch.lines() {
        if line.starts_with("+++") || line.starts_with("---") || line.starts_with("diff ") {
            println!("{}", line.bold());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

fn cmd_reset(store: &CheckpointStore, args: ResetArgs) -> anyhow::Result<()> {
    let id: ObjectId = ckpt_core::parse_commit_id(&args.commit)?;
    store.reset(id)?;
    println!("{} Workspace reset to {}", "✓".green().bold(), id.short_hex().yellow());
    Ok(())
}

fn cmd_rollback(store: &CheckpointStore, args: RollbackArgs) -> anyhow::Result<()> {
    store.rollback(args.commit.as_str(), &args.file)?;
    println!(
        "{} Restored {} from {}",
        "✓".green().bold(),
        args.file.display().to_string().bold(),
        args.commit.yellow()
    );
    Ok(())
}

fn cmd_workspaces(service: &CheckpointService, args: WorkspacesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let workspaces = if args.cached {
        service.cached_workspaces()?
    } else {
        service.workspaces()?
    };
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&workspaces)?);
        return Ok(());
    }
    if workspaces.is_empty() {
        println!("No checkpoint stores under {}", service.stores_root().display());
    }
    for ws in workspaces {
        let marker = if ws.is_dir() { "".normal() } else { " (missing)".red() };
        println!("{}{marker}", ws.display());
    }
    Ok(())
}

fn cmd_drop(service: &CheckpointService, workspace: &std::path::Path) -> anyhow::Result<()> {
    if service.drop_store(workspace)? {
        println!("{} Dropped checkpoints of {}", "✓".green().bold(), workspace.display());
    } else {
        println!("No checkpoints for {}", workspace.display());
    }
    Ok(())
}

fn cmd_prune(service: &CheckpointService) -> anyhow::Result<()> {
    let pruned = service.prune()?;
    for ws in &pruned {
        println!("  {} {}", "pruned:".red(), ws.display());
    }
    println!("{} {} store(s) removed.", "✓".green(), pruned.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_millis() {
        let text = format_time(0);
        assert!(text.starts_with("1970-01-01") || text.starts_with("1969-12-31"), "{text}");
    }

    #[test]
    fn out_of_range_time_falls_back_to_number() {
        assert_eq!(format_time(u64::MAX), u64::MAX.to_string());
    }
}
