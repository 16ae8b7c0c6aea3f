use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use polltrack::config::Config;
use polltrack::export::write_export;
use polltrack::logging;
use polltrack::pipeline::Pipeline;
use polltrack::storage::{SqliteStorage, Storage};
use polltrack::types::RunStats;

#[derive(Parser)]
#[command(name = "polltrack")]
#[command(about = "Korean party-support polling data normalizer")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize the source CSV and seed the SQLite store
    Seed {
        /// Source CSV path (overrides config.toml)
        #[arg(long)]
        input: Option<PathBuf>,
        /// SQLite store path (overrides config.toml)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Normalize and write the dashboard JSON export
    Export {
        /// Source CSV path (overrides config.toml)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output directory for party-support.json (overrides config.toml)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Re-aggregate from the SQLite store instead of reading the CSV
        #[arg(long)]
        from_db: bool,
        /// SQLite store path, used with --from-db (overrides config.toml)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Run seed and export sequentially
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn print_summary(stats: &RunStats) {
    println!("\n📊 Run summary:");
    println!("   Rows read: {}", stats.total_rows);
    println!("   Entries emitted: {}", stats.emitted_entries);
    println!("   Rows skipped: {}", stats.skipped_rows);
    println!("   Errors: {}", stats.errors.len());

    if !stats.errors.is_empty() {
        warn!("{} rows skipped during normalization", stats.errors.len());
        println!("\n⚠️  Skipped rows:");
        for error in &stats.errors {
            println!("   - {error}");
        }
    }
}

async fn seed(input: &PathBuf, db: &PathBuf) -> anyhow::Result<RunStats> {
    println!("🔄 Seeding store from {}...", input.display());
    let (facts, _polls, stats) = Pipeline::run_from_csv(input)?;

    let storage = SqliteStorage::open(db)?;
    let written = storage.replace_all_facts(&facts).await?;
    info!("Seeded {} facts into {}", written, db.display());
    println!("💾 Seeded {} facts into {}", written, db.display());
    Ok(stats)
}

async fn export_from_csv(input: &PathBuf, out: &PathBuf) -> anyhow::Result<RunStats> {
    println!("🔄 Normalizing {}...", input.display());
    let (_facts, polls, stats) = Pipeline::run_from_csv(input)?;

    let output_path = write_export(&polls, out)?;
    println!("💾 Exported {} entries to {}", polls.table.len(), output_path.display());
    Ok(stats)
}

async fn export_from_db(db: &PathBuf, out: &PathBuf) -> anyhow::Result<()> {
    println!("🔄 Re-aggregating from store {}...", db.display());
    let storage = SqliteStorage::open(db)?;
    let facts = storage.fetch_all_facts().await?;
    let polls = Pipeline::aggregate_facts(&facts);

    let output_path = write_export(&polls, out)?;
    println!("💾 Exported {} entries to {}", polls.table.len(), output_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Seed { input, db } => {
            let input = input.unwrap_or(config.input_csv);
            let db = db.unwrap_or(config.db_path);
            let stats = seed(&input, &db).await?;
            print_summary(&stats);
        }
        Commands::Export { input, out, from_db, db } => {
            let out = out.unwrap_or(config.output_dir);
            if from_db {
                let db = db.unwrap_or(config.db_path);
                export_from_db(&db, &out).await?;
            } else {
                let input = input.unwrap_or(config.input_csv);
                let stats = export_from_csv(&input, &out).await?;
                print_summary(&stats);
            }
        }
        Commands::Run { input, db, out } => {
            let input = input.unwrap_or(config.input_csv);
            let db = db.unwrap_or(config.db_path);
            let out = out.unwrap_or(config.output_dir);

            let stats = seed(&input, &db).await?;
            print_summary(&stats);

            export_from_db(&db, &out).await?;
            println!("\n✅ Run complete");
        }
    }

    Ok(())
}
