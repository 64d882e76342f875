use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jobstore_core::types::{LOCK_STATE_ACCESS, LOCK_TRIGGER_ACCESS};
use jobstore_core::JobStoreConfig;
use jobstore_delegate::dialect::PRODUCT_SIGNATURES;
use jobstore_delegate::{
    db, Connection, DatabaseMetadata, DelegateBinding, DelegateRegistry, Dialect,
    SqliteConnection,
};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(
    author,
    about = "Inspect and initialise job store driver delegates",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("JOBSTORE_GIT_SHA"), ")")
)]
struct Cli {
    /// Config file (default: $JOBSTORE_CONFIG, then ~/.jobstore/jobstore.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in dialects and the products they serve
    Dialects {
        #[arg(long)]
        json: bool,
    },

    /// Show which delegate the store would bind
    ///
    /// Without --delegate or --product the configured database is opened and
    /// its own metadata is used.
    Resolve {
        /// Explicit identifier, overriding store.driver_delegate
        #[arg(long)]
        delegate: Option<String>,

        /// Database product name to detect from, e.g. "PostgreSQL"
        #[arg(long)]
        product: Option<String>,

        #[arg(long, requires = "product")]
        product_version: Option<String>,

        #[arg(long, requires = "product")]
        major_version: Option<u32>,
    },

    /// Create the job store tables in a SQLite database
    Init {
        /// Database file (default: database.path from config)
        #[arg(long, value_name = "PATH")]
        db: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobstore=info,jobstore_delegate=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // explicit path > JOBSTORE_CONFIG env > ~/.jobstore/jobstore.toml
    let config_path = cli
        .config
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| std::env::var("JOBSTORE_CONFIG").ok());
    let mut config = load_config(config_path.as_deref())?;

    match cli.command {
        Commands::Dialects { json } => print_dialects(json),
        Commands::Resolve {
            delegate,
            product,
            product_version,
            major_version,
        } => {
            if delegate.is_some() {
                config.store.driver_delegate = delegate;
            }
            let metadata = match product {
                Some(name) => {
                    let meta = DatabaseMetadata::new(name, product_version.unwrap_or_default());
                    Some(match major_version {
                        Some(major) => meta.with_major_version(major),
                        None => meta,
                    })
                }
                None if config.store.driver_delegate().is_none() => {
                    let conn = SqliteConnection::open(&config.database.path)
                        .with_context(|| format!("failed to open {}", config.database.path))?;
                    Some(conn.metadata()?)
                }
                None => None,
            };
            let resolved = DelegateRegistry::new().resolve(&config.store, metadata.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&resolved.descriptor)?);
            Ok(())
        }
        Commands::Init { db } => {
            let path = db
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| config.database.path.clone());
            init_store(&config, &path)
        }
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<JobStoreConfig> {
    JobStoreConfig::load(path)
        .map_err(|e| anyhow::anyhow!("failed to load job store config [{}]: {e}", e.code()))
}

fn init_store(config: &JobStoreConfig, path: &str) -> anyhow::Result<()> {
    ensure_parent_dir(path);
    info!(path = %path, "opening SQLite database");
    let conn = SqliteConnection::open(path).with_context(|| format!("failed to open {path}"))?;
    db::init_sqlite(conn.raw(), &config.store.table_prefix)?;
    info!(prefix = %config.store.table_prefix, "schema ready");

    let registry = DelegateRegistry::new();
    let mut binding = DelegateBinding::new();
    let metadata = conn.metadata()?;
    let descriptor = binding.bind(&registry, &config.store, Some(&metadata))?.clone();
    let delegate = binding.delegate()?;

    let existing = delegate.select_lock_names(&conn)?;
    for lock in [LOCK_TRIGGER_ACCESS, LOCK_STATE_ACCESS] {
        if !existing.iter().any(|name| name == lock) {
            delegate.insert_lock(&conn, lock)?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    binding.release();
    Ok(())
}

#[derive(Serialize)]
struct DialectRow {
    identifier: &'static str,
    aliases: &'static [&'static str],
    marshaller: &'static str,
    products: Vec<String>,
}

fn dialect_rows() -> Vec<DialectRow> {
    Dialect::ALL
        .into_iter()
        .map(|dialect| {
            let products = match dialect {
                Dialect::Db2v6 => vec!["DB2* major version 6".to_string()],
                Dialect::Db2v7 => vec!["DB2* major version 7".to_string()],
                Dialect::Db2v8 => vec!["DB2* major version >= 8 or unknown".to_string()],
                _ => PRODUCT_SIGNATURES
                    .iter()
                    .filter(|(_, d)| *d == dialect)
                    .map(|(name, _)| name.to_string())
                    .collect(),
            };
            DialectRow {
                identifier: dialect.identifier(),
                aliases: dialect.aliases(),
                marshaller: dialect.marshaller().name(),
                products,
            }
        })
        .collect()
}

fn print_dialects(json: bool) -> anyhow::Result<()> {
    let rows = dialect_rows();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    println!("{:<12} {:<16} {:<16} PRODUCTS", "DIALECT", "ALIASES", "BOOLEANS");
    for row in rows {
        println!(
            "{:<12} {:<16} {:<16} {}",
            row.identifier,
            row.aliases.join(","),
            row.marshaller,
            row.products.join(", ")
        );
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
