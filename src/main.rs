//! Benchsync CLI - sync compliance configuration trees into SQLite

use benchsync::config::{self, BenchsyncConfig};
use benchsync::sql::DEFAULT_DIALECT;
use benchsync::storage::SqliteStore;
use benchsync::ui::{self, Icons, Spinner};
use benchsync::{CatalogBuilder, ClearScope, SyncReport, TableExtractor, WriteMode};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "benchsync")]
#[command(version)]
#[command(about = "Compliance configuration sync engine")]
#[command(long_about = r#"
Benchsync loads a tree of benchmarks, controls, queries and enrichment
text, resolves the benchmark hierarchy and writes it into SQLite.

Example usage:
  benchsync sync --path ./compliance
  benchsync sync --path ./compliance --mode upsert --clear links-only
  benchsync stats
  benchsync tables --sql "SELECT * FROM aws_s3_bucket"
  benchsync metadata --path ./compliance --benchmark cis_v1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration tree and synchronize it into the database
    Sync {
        /// Root of the configuration tree
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Path to benchsync.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Row write mode: insert-skip or upsert
        #[arg(short, long)]
        mode: Option<String>,

        /// Tables cleared before writing: all or links-only
        #[arg(long)]
        clear: Option<String>,
    },

    /// Show row counts of the synchronized tables
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Path to benchsync.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the tables a SQL statement reads from
    Tables {
        /// SQL text
        #[arg(short, long)]
        sql: String,

        /// SQL dialect used for parsing
        #[arg(long, default_value = DEFAULT_DIALECT)]
        dialect: String,
    },

    /// Show the resolved metadata of one benchmark without writing anything
    Metadata {
        /// Root of the configuration tree
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Benchmark id
        #[arg(short, long)]
        benchmark: String,

        /// Path to benchsync.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Sync {
            path,
            database,
            config,
            mode,
            clear,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(mode) = mode {
                config.write_mode = mode.parse::<WriteMode>()?;
            }
            if let Some(clear) = clear {
                config.clear_scope = clear.parse::<ClearScope>()?;
            }
            let root = tree_root(path, &config)?;
            let database = database_path(database, &config);

            ui::header("Synchronizing configuration tree");
            ui::status(Icons::FOLDER, "Path", &root.display().to_string());
            ui::status(Icons::DATABASE, "Database", &database.display().to_string());
            ui::status(
                Icons::GEAR,
                "Mode",
                &format!("{}, clear {}", config.write_mode, config.clear_scope),
            );

            config::ensure_db_dir(&database)?;
            let mut store = SqliteStore::open(&database)?;

            let spinner = Spinner::new("Loading and writing...");
            let result = benchsync::sync(&root, &mut store, &config);
            let elapsed = spinner.finish_and_clear();

            match result {
                Ok(report) => {
                    print_sync_report(&report);
                    ui::timing(&elapsed);
                }
                Err(e) => {
                    if e.leaves_store_untouched() {
                        ui::error(&format!("Sync failed, database left unchanged: {}", e));
                    } else {
                        ui::error(&format!("Sync stopped, earlier steps stay committed: {}", e));
                    }
                    return Err(e.into());
                }
            }
        }

        Commands::Stats { database, config } => {
            let config = load_config(config.as_deref())?;
            let database = database_path(database, &config);
            if !database.exists() {
                ui::warn(&format!("No database at {}", database.display()));
                return Ok(());
            }

            let store = SqliteStore::open(&database)?;
            let stats = store.stats()?;

            ui::section(&format!("{} Database Statistics", Icons::STATS));
            println!("{}", ui::db_stats_table(&stats));

            let tables = store.referenced_tables()?;
            if !tables.is_empty() {
                ui::info("Referenced tables", &tables.len().to_string());
            }
        }

        Commands::Tables { sql, dialect } => {
            let extractor = TableExtractor::new(&dialect)?;
            let tables = extractor.extract_table_set(&sql)?;

            ui::section(&format!("{} Tables ({})", Icons::TABLE, tables.len()));
            for table in &tables {
                ui::list_item(&ui::id(table));
            }
        }

        Commands::Metadata {
            path,
            benchmark,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let root = tree_root(path, &config)?;

            let spinner = Spinner::new("Loading configuration tree...");
            let catalog = CatalogBuilder::new(&config)?.load(&root);
            spinner.finish_and_clear();
            let catalog = catalog?;

            let Some(found) = catalog.benchmark(&benchmark) else {
                ui::error(&format!("Benchmark not found: {}", benchmark));
                return Ok(());
            };

            ui::section(&format!("{} {}", Icons::SHIELD, found.title));
            ui::summary_row("Id:", &ui::id(&found.id));
            ui::summary_row("Direct children:", &found.children.len().to_string());
            ui::summary_row("Direct controls:", &found.controls.len().to_string());
            if !found.integration_types.is_empty() {
                let types: Vec<&str> = found.integration_types.iter().map(String::as_str).collect();
                ui::summary_row("Integration types:", &types.join(", "));
            }

            println!(
                "{}",
                ui::stats_table(&[
                    ("Controls", &found.metadata.controls.len().to_string()),
                    ("Primary tables", &found.metadata.primary_tables.len().to_string()),
                    ("Tables", &found.metadata.list_of_tables.len().to_string()),
                ])
            );

            ui::section(&format!("{} Resolved metadata", Icons::TREE));
            println!("{}", serde_json::to_string_pretty(&found.metadata)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BenchsyncConfig> {
    Ok(config::load_config(path)?.unwrap_or_default())
}

fn tree_root(path: Option<PathBuf>, config: &BenchsyncConfig) -> anyhow::Result<PathBuf> {
    path.or_else(|| config.path.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("No configuration tree given: pass --path or set `path` in benchsync.toml"))
}

fn database_path(database: Option<PathBuf>, config: &BenchsyncConfig) -> PathBuf {
    database
        .or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
}

fn print_sync_report(report: &SyncReport) {
    ui::success("Sync complete");

    let table = ui::outcome_table(report);
    if !table.is_empty() {
        println!("{}", table);
    }

    if !report.load.is_clean() {
        ui::warn(&format!("{} load warning(s)", report.load.warning_count()));
        for link in &report.load.unresolved_children {
            ui::dropped(&link.benchmark_id, &link.target_id, "unknown child benchmark");
        }
        for link in &report.load.unresolved_controls {
            ui::dropped(&link.benchmark_id, &link.target_id, "unknown control");
        }
        let duplicates = report
            .load
            .duplicate_queries
            .iter()
            .chain(&report.load.duplicate_controls)
            .chain(&report.load.duplicate_views);
        for id in duplicates {
            ui::list_item(&format!("{} {}", ui::muted("duplicate id ignored"), ui::id(id)));
        }
        for id in &report.load.dropped_queries {
            ui::list_item(&format!("{} {}", ui::muted("dropped query"), ui::id(id)));
        }
        for id in &report.load.dropped_views {
            ui::list_item(&format!("{} {}", ui::muted("dropped query view"), ui::id(id)));
        }
        for id in &report.load.cycles {
            ui::list_item(&format!("{} {}", ui::muted("cycle cut at"), ui::id(id)));
        }
    }

    if !report.missing_queries.is_empty() {
        ui::warn(&format!(
            "{} control(s) skipped for missing queries",
            report.missing_queries.len()
        ));
        for missing in &report.missing_queries {
            ui::dropped(&missing.control_id, &missing.query_id, "missing query");
        }
    }

    if !report.dropped_links.is_empty() {
        ui::warn(&format!("{} {} link(s) dropped", Icons::LINK, report.dropped_links.len()));
        for link in &report.dropped_links {
            ui::dropped(&link.owner_id, &link.target_id, link.table.as_str());
        }
    }

    for warning in &report.warnings {
        ui::warn(warning);
    }

    if report.failed_rows() > 0 {
        ui::error(&format!("{} row(s) failed to write", report.failed_rows()));
    }
}
