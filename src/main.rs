use anyhow::Result;
use atlas::config;
use atlas::pipeline::{import_file, BatchPolicy, ImportOptions};
use atlas::stats::ImportStats;
use atlas::store::{SqliteStore, Store};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Parse regional internet registry dumps and import them into SQLite")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import registry dump files into a fresh allocation database
    Import(ImportArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// SQLite database file to create and populate
    #[arg(short, long, default_value = "atlas.db")]
    database: PathBuf,

    /// Dump files to import (.gz or plain); a directory is expanded to
    /// the well-known dump set inside it
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Writer threads (defaults to the CPU count)
    #[arg(long)]
    workers: Option<usize>,

    /// Blocks committed per transaction before the session is rotated
    #[arg(long, default_value_t = config::COMMIT_COUNT)]
    batch_size: u64,

    /// Upper bound on blocks queued between the reader and the writers
    #[arg(long, default_value_t = config::BLOCK_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Append to an existing database instead of dropping the table first
    #[arg(long)]
    keep_schema: bool,
}

/// A directory input stands for the well-known dump set inside it.
fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for name in config::DEFAULT_DUMP_FILES {
                files.push(input.join(name));
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn run_import(args: ImportArgs) -> Result<()> {
    let overall_start = Instant::now();

    let store = Arc::new(SqliteStore::new(&args.database));
    if !args.keep_schema {
        store.recreate_schema()?;
    }

    let opts = ImportOptions {
        workers: args.workers.unwrap_or_else(num_cpus::get),
        batch: BatchPolicy {
            commit_count: args.batch_size.max(1),
        },
        queue_capacity: args.queue_capacity,
    };
    let stats = Arc::new(ImportStats::new());

    for path in expand_inputs(&args.inputs) {
        if !path.exists() {
            info!(file = %path.display(), "file not found, skipping");
            continue;
        }
        info!(file = %path.display(), "parsing database file");
        let start = Instant::now();
        import_file(&store, &path, &opts, &stats)?;
        stats.inc_files();
        info!(
            file = %path.display(),
            duration_secs = start.elapsed().as_secs_f64(),
            "file finished"
        );
    }

    let elapsed = overall_start.elapsed();
    println!();
    println!("=== Summary ===");
    println!("Total time:         {:.2}s", elapsed.as_secs_f64());
    println!();
    println!("Files imported:     {}", stats.files());
    println!("Blocks parsed:      {}", stats.blocks());
    println!("Blocks failed:      {}", stats.failed());
    println!("Lines skipped:      {}", stats.skipped());
    println!("Records written:    {}", stats.records());
    println!();
    println!("Database at:        {}", args.database.display());

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Import(args) => run_import(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
