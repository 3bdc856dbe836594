//! loom-migrate CLI
//!
//! Command-line tool for keeping a database in line with a JSON table model.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use loom_migrate::prelude::*;
use loom_migrate::schema_file;
use loom_sql_core::Dialect;
use loom_sql_core::ddl::{DdlOptions, generate_ddl_statements};

/// Additive schema synchronization with data-safety preflight checks.
#[derive(Parser)]
#[command(name = "loom-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Table model file.
    #[arg(short, long, env = "LOOM_SCHEMA", default_value = "schema.json")]
    schema: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL of every table without touching the database.
    Ddl {
        /// Target dialect (sqlite, postgres, mysql).
        #[arg(short = 'D', long, default_value = "sqlite")]
        dialect: Dialect,
    },

    /// Report drift between the model and the live schema.
    Check,

    /// Create missing tables and add missing columns and indexes.
    Ensure {
        /// Also add missing unique and foreign key constraints.
        #[arg(long)]
        constraints: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let tables = schema_file::load(&cli.schema)?;
    info!(tables = tables.len(), schema = %cli.schema.display(), "Loaded table model");

    if let Commands::Ddl { dialect } = cli.command {
        for table in &tables {
            for statement in generate_ddl_statements(table, dialect, DdlOptions::default()) {
                println!("{};", statement.render_ddl(dialect)?);
            }
            println!();
        }
        return Ok(());
    }

    let sync = SchemaSync::new(SqliteDriver::connect(&cli.database).await?);

    match cli.command {
        Commands::Ddl { .. } => {}

        Commands::Check => {
            let mut drifted = 0;
            for table in &tables {
                match sync.inspect(table).await? {
                    None => {
                        println!("{}: missing", table.name());
                        drifted += 1;
                    }
                    Some(report) => {
                        println!("{report}");
                        if !report.is_clean() {
                            drifted += 1;
                        }
                    }
                }
            }
            if drifted > 0 {
                warn!(tables = drifted, "Schema drift found");
                anyhow::bail!("{drifted} table(s) out of sync with {}", cli.schema.display());
            }
            info!("Schema in sync");
        }

        Commands::Ensure { constraints } => {
            for table in &tables {
                let report = if constraints {
                    sync.ensure_constraints(table).await?
                } else {
                    sync.ensure_table(table).await?
                };
                if report.is_unchanged() {
                    info!(table = %report.table, "Up to date");
                } else {
                    info!(
                        table = %report.table,
                        created = report.created,
                        columns = report.added_columns.len(),
                        indexes = report.created_indexes.len(),
                        constraints = report.added_constraints.len(),
                        "Applied changes"
                    );
                }
            }
        }
    }

    Ok(())
}
