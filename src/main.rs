//! `media-gc` — operator CLI.
//!
//! ```text
//! media-gc --snapshot site.json gc --dry-run --list
//! media-gc --snapshot site.json cleanup-tags
//! media-gc --snapshot site.json --workspace live list
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use media_gc::gc::DEFAULT_PAGE_SIZE;
use media_gc::report::{self, ListingTotals};
use media_gc::storage::OpenStore;
use media_gc::{
    AssetId, CancelToken, GcConfig, IdentityPolicy, MediaManager, Result, StoreConfig,
    SweepReport, WorkspaceScope,
};

#[derive(Debug, Parser)]
#[command(name = "media-gc", version, about = "Garbage collect unused image assets")]
struct Cli {
    /// JSON snapshot holding the content graph and the media repository
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Key used to match references against stored records
    #[arg(long, default_value_t = IdentityPolicy::Identifier)]
    identity: IdentityPolicy,

    /// Only let nodes from this workspace keep images alive (repeatable; default: all)
    #[arg(long = "workspace")]
    workspaces: Vec<String>,

    /// Nodes / records fetched per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Delete all image records, referenced or not
    Prune {
        #[arg(long)]
        dry_run: bool,
        /// Print every selected record
        #[arg(long)]
        list: bool,
    },
    /// Delete image records no node in scope references
    Gc {
        #[arg(long)]
        dry_run: bool,
        /// Print every selected record
        #[arg(long)]
        list: bool,
    },
    /// Delete tags no image carries
    CleanupTags,
    /// Show one image and its variants
    Show { identifier: String },
    /// List all images with a size summary
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let scope = if cli.workspaces.is_empty() {
        WorkspaceScope::All
    } else {
        WorkspaceScope::Only(cli.workspaces)
    };
    let config = GcConfig::default()
        .with_scope(scope)
        .with_identity(cli.identity)
        .with_page_size(cli.page_size);
    config.validate()?;

    let mut opened = StoreConfig::Snapshot { path: cli.snapshot }.open()?;
    let manager = MediaManager::new(opened.graph.clone(), opened.store.clone(), config);

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping before commit");
            on_interrupt.cancel();
        }
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Prune { dry_run, list } => {
            let sweep = manager.prune(dry_run, &cancel).await?;
            if list {
                report::write_candidates(&mut out, &sweep)?;
            }
            report::write_prune_summary(&mut out, &sweep)?;
            persist_sweep(&mut opened, &sweep)?;
            Ok(exit_code(&sweep))
        }
        Command::Gc { dry_run, list } => {
            let outcome = manager.gc(dry_run, &cancel).await?;
            if list {
                report::write_candidates(&mut out, &outcome.sweep)?;
            }
            report::write_gc_summary(&mut out, &outcome.sweep)?;
            persist_sweep(&mut opened, &outcome.sweep)?;
            Ok(exit_code(&outcome.sweep))
        }
        Command::CleanupTags => {
            let labels = manager.cleanup_tags().await?;
            for label in &labels {
                report::write_tag_deleted(&mut out, label)?;
            }
            if !labels.is_empty() {
                opened.persist()?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { identifier } => {
            let image = manager.show(&AssetId::from(identifier)).await?;
            report::write_image_details(&mut out, &image)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::List => {
            let mut totals = ListingTotals::default();
            manager
                .for_each_image(|image| {
                    totals.add(image);
                    report::write_listing_line(&mut out, image)?;
                    Ok(())
                })
                .await?;
            report::write_listing_summary(&mut out, &totals)?;
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Write the snapshot back, but only if the sweep committed something.
fn persist_sweep(opened: &mut OpenStore, sweep: &SweepReport) -> Result<()> {
    if sweep.dry_run || sweep.removed == 0 {
        return Ok(());
    }
    opened.persist()
}

fn exit_code(sweep: &SweepReport) -> ExitCode {
    if sweep.is_complete() {
        ExitCode::SUCCESS
    } else {
        eprintln!("{} removal(s) could not be committed", sweep.failed.len());
        ExitCode::FAILURE
    }
}
