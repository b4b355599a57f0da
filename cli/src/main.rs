use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use vsfs_core::VsfsError;
use vsfs_filesystems::{CreateReport, InstallReport, JournalStatus, Vsfs, WalkOutcome};

#[derive(Parser)]
#[command(name = "vsfs")]
#[command(about = "Metadata journaling for VSFS images", long_about = None)]
struct Cli {
    /// Image file to operate on
    #[arg(short, long, env = "VSFS_IMAGE", default_value = "vsfs.img")]
    image: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a file-creation transaction
    Create {
        /// Name of the file to create in the root directory
        filename: String,
    },
    /// Replay and truncate the journal
    Install,
    /// Print journal usage without changing anything
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let mut fs = Vsfs::open(&cli.image)?;
    log::info!("Opened image {}", cli.image.display());

    match cli.command {
        Commands::Create { filename } => {
            let report = fs.create(&filename).map_err(create_failure)?;
            if cli.json {
                print_json(&report)?;
            } else {
                print_create(&report);
            }
        }
        Commands::Install => {
            let report = fs.install()?;
            if cli.json {
                print_json(&report)?;
            } else {
                print_install(&report);
            }
            check_replay(&report)?;
        }
        Commands::Status => {
            let status = fs.journal_status()?;
            if cli.json {
                print_json(&status)?;
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

/// Validation faults are the operator's to fix; everything else is reported as is
fn create_failure(err: VsfsError) -> anyhow::Error {
    if err.is_validation() {
        anyhow::anyhow!("create rejected: {}", err)
    } else {
        err.into()
    }
}

/// A replay that stopped on a corrupt record still fails the command
fn check_replay(report: &InstallReport) -> anyhow::Result<()> {
    if let Some(halt) = &report.halted {
        anyhow::bail!(
            "journal replay halted at offset {}: {}",
            halt.offset,
            halt.reason
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_create(report: &CreateReport) {
    println!("Logged creation of \"{}\" to journal.", report.name);
    println!("  Inode: {}", report.inode);
    println!("  Directory slot: {}", report.slot);
    println!("  Pending transactions: {}", report.pending_transactions);
    println!("  Free inodes after install: {}", report.free_inodes);
    println!("  Journal bytes used: {}", report.journal_bytes_used);
}

fn print_install(report: &InstallReport) {
    if report.was_empty {
        println!("Journal is empty, nothing to install.");
        return;
    }
    println!(
        "Installed {} committed transaction(s) from journal ({} block(s) written).",
        report.transactions, report.blocks_written
    );
    if report.discarded_tail > 0 {
        println!("  Discarded {} uncommitted record(s).", report.discarded_tail);
    }
}

fn print_status(status: &JournalStatus) {
    if !status.exists {
        println!("Journal does not exist (it is created by the first 'create').");
        return;
    }
    println!("Journal: {} of {} bytes used", status.bytes_used, status.capacity);
    println!(
        "  Pending transactions: {} ({} block(s))",
        status.pending_transactions, status.pending_blocks
    );
    println!("  Creates before install is required: {}", status.creates_remaining);
    match &status.outcome {
        WalkOutcome::Clean => {}
        WalkOutcome::UncommittedTail { offset, records } => {
            println!("  Uncommitted tail: {} record(s) at offset {}", records, offset);
        }
        WalkOutcome::Corrupt { offset, reason } => {
            println!("  Corrupt at offset {}: {}", offset, reason);
        }
    }
}
