//! Print command implementation.

use super::{resolve, CommandResult};
use serde::Serialize;
use waterview_core::{Document, DocumentStore};

/// What `print` shows.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PrintResult {
    /// A database and its collections.
    Database {
        /// Database name.
        name: String,
        /// Collections with their document counts.
        collections: Vec<CollectionSummary>,
    },
    /// One collection's documents.
    Collection {
        /// Database name.
        database: String,
        /// Collection name.
        name: String,
        /// Stored documents, in order.
        documents: Vec<Document>,
    },
}

/// A collection line in a database listing.
#[derive(Debug, Serialize)]
pub struct CollectionSummary {
    /// Collection name.
    pub name: String,
    /// Number of documents.
    pub documents: usize,
}

/// Runs the print command. `target` is `db` or `db/collection`.
pub fn run(store: &DocumentStore, target: Option<&str>, format: &str) -> CommandResult {
    let (db, collection) = match target.map(|t| t.split_once('/')) {
        Some(Some((db, collection))) => (Some(db), Some(collection)),
        Some(None) => (target, None),
        None => (None, None),
    };
    let conn = resolve(store, db)?;

    let result = match collection {
        Some(name) => PrintResult::Collection {
            database: conn.name().to_string(),
            name: name.to_string(),
            documents: store.get_all(&conn, name)?,
        },
        None => {
            let mut collections = Vec::new();
            for name in store.list_collections(&conn)? {
                let documents = store.get_all(&conn, &name)?.len();
                collections.push(CollectionSummary { name, documents });
            }
            PrintResult::Database {
                name: conn.name().to_string(),
                collections,
            }
        }
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result)?,
    }
    Ok(())
}

fn print_text_output(result: &PrintResult) -> CommandResult {
    match result {
        PrintResult::Database { name, collections } => {
            println!("{name} ->");
            if collections.is_empty() {
                println!("  (no collections)");
            }
            for col in collections {
                println!("  {} ({} documents)", col.name, col.documents);
            }
        }
        PrintResult::Collection {
            database,
            name,
            documents,
        } => {
            println!("{name} of DB {database} ->");
            println!("{}", serde_json::to_string_pretty(documents)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::documents;
    use tempfile::tempdir;

    #[test]
    fn print_leaves_selection_alone() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let other = store.create_database("other").unwrap();
        store.create_collection(&other, "posts").unwrap();
        store.create_database("testDB").unwrap();

        run(&store, Some("other"), "json").unwrap();
        run(&store, Some("other/posts"), "text").unwrap();

        assert_eq!(store.selected_database().unwrap().as_deref(), Some("testDB"));
    }

    #[test]
    fn reads_do_not_rewrite_config() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let conn = store.create_database("testDB").unwrap();
        store.create_collection(&conn, "users").unwrap();

        // Compact text; the store itself writes it pretty-printed.
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{"name":"testDB","collections":["users"]}"#).unwrap();

        run(&store, None, "text").unwrap();
        documents::get_all(&store, None, "users").unwrap();
        documents::get_where(&store, None, "users", r#"{"a":1}"#, false).unwrap();

        assert_eq!(
            std::fs::read_to_string(&config).unwrap(),
            r#"{"name":"testDB","collections":["users"]}"#
        );
    }
}
