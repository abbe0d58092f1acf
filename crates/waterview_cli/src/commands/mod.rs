//! CLI command implementations.

pub mod collection;
pub mod database;
pub mod documents;
pub mod print;

use waterview_core::{Connection, CoreResult, DocumentStore};

/// Result type shared by all commands.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Opens `db`, or the selected database when `db` is `None`.
///
/// Never changes the recorded selection.
pub fn resolve(store: &DocumentStore, db: Option<&str>) -> CoreResult<Connection> {
    match db {
        Some(name) => store.open_database(name),
        None => store.connect_default(),
    }
}
