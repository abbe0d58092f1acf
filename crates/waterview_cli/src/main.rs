//! Waterview CLI
//!
//! Command-line tools for Waterview document stores.
//!
//! # Commands
//!
//! - `create-db`, `connect`, `drop-db` - Manage databases
//! - `create-collection`, `drop-collection` - Manage collections
//! - `insert`, `get-all`, `get-where` - Read and write documents
//! - `print` - Show a database or collection
//! - `repair` - Rebuild a database registry from disk

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use waterview_core::{Config, DocumentStore};

/// Waterview command-line document store tools.
#[derive(Parser)]
#[command(name = "waterview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Database to use instead of the selected one
    #[arg(global = true, long)]
    db: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a database and select it
    CreateDb {
        /// Database name
        name: String,
    },

    /// Select an existing database
    Connect {
        /// Database name
        name: String,
    },

    /// Delete a database and all its collections
    DropDb {
        /// Database name
        name: String,
    },

    /// Create an empty collection
    CreateCollection {
        /// Collection name
        name: String,
    },

    /// Delete a collection
    DropCollection {
        /// Collection name
        name: String,
    },

    /// Insert a JSON object, or every object of a JSON array
    Insert {
        /// Collection name
        collection: String,

        /// Document(s) as JSON
        json: String,
    },

    /// Print every document of a collection
    GetAll {
        /// Collection name
        collection: String,
    },

    /// Print the first document whose fields equal the given ones
    GetWhere {
        /// Collection name
        collection: String,

        /// Predicate as a JSON object, e.g. '{"age": 20}'
        predicate: String,

        /// Print every match instead of the first
        #[arg(short, long)]
        all: bool,
    },

    /// Show a database's collections, or a collection's documents
    Print {
        /// `db` or `db/collection`; defaults to the selected database
        target: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rebuild a database registry from the collections on disk
    Repair {
        /// Database name; defaults to the selected database
        name: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("Waterview CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Waterview Core v{}", waterview_core::VERSION);
        return Ok(());
    }

    // Only create-db and connect move the recorded selection.
    let store = DocumentStore::open_with_config(&cli.data_dir, Config::default())?;
    let db = cli.db.as_deref();

    match cli.command {
        Commands::CreateDb { name } => commands::database::create(&store, &name)?,
        Commands::Connect { name } => commands::database::connect(&store, &name)?,
        Commands::DropDb { name } => commands::database::drop(&store, &name)?,
        Commands::Repair { name } => commands::database::repair(&store, name.as_deref().or(db))?,
        Commands::CreateCollection { name } => {
            commands::collection::create(&store, db, &name)?;
        }
        Commands::DropCollection { name } => commands::collection::drop(&store, db, &name)?,
        Commands::Insert { collection, json } => {
            commands::documents::insert(&store, db, &collection, &json)?;
        }
        Commands::GetAll { collection } => commands::documents::get_all(&store, db, &collection)?,
        Commands::GetWhere {
            collection,
            predicate,
            all,
        } => commands::documents::get_where(&store, db, &collection, &predicate, all)?,
        Commands::Print { target, format } => {
            commands::print::run(&store, target.as_deref().or(db), &format)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
