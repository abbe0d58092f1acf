//! Collection commands: create-collection, drop-collection.

use super::{resolve, CommandResult};
use waterview_core::DocumentStore;

/// Runs `create-collection`.
pub fn create(store: &DocumentStore, db: Option<&str>, name: &str) -> CommandResult {
    let conn = resolve(store, db)?;
    store.create_collection(&conn, name)?;
    println!("Created collection {name} in {conn}");
    Ok(())
}

/// Runs `drop-collection`.
pub fn drop(store: &DocumentStore, db: Option<&str>, name: &str) -> CommandResult {
    let conn = resolve(store, db)?;
    store.delete_collection(&conn, name)?;
    println!("Removed collection {name} of {conn}");
    Ok(())
}
