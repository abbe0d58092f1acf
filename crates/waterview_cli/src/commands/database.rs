//! Database commands: create-db, connect, drop-db, repair.

use super::{resolve, CommandResult};
use waterview_core::DocumentStore;

/// Runs `create-db`.
pub fn create(store: &DocumentStore, name: &str) -> CommandResult {
    let conn = store.create_database(name)?;
    println!("Created database {conn}");
    Ok(())
}

/// Runs `connect`.
pub fn connect(store: &DocumentStore, name: &str) -> CommandResult {
    let conn = store.connect(name)?;
    let collections = store.list_collections(&conn)?;
    println!("Connected to {conn} ({} collections)", collections.len());
    Ok(())
}

/// Runs `drop-db`.
pub fn drop(store: &DocumentStore, name: &str) -> CommandResult {
    store.delete_database(name)?;
    println!("Removed database {name}");
    Ok(())
}

/// Runs `repair`.
pub fn repair(store: &DocumentStore, name: Option<&str>) -> CommandResult {
    let name = match name {
        Some(name) => name.to_string(),
        None => store
            .selected_database()?
            .ok_or("no database selected; pass a name or --db")?,
    };

    let before = store.open_database(&name).map(|conn| store.list_collections(&conn));
    let registry = store.rebuild_registry(&name)?;

    println!("Rebuilt registry of {}", registry.name);
    if let Ok(Ok(before)) = before {
        for added in registry.collections.iter().filter(|c| !before.contains(c)) {
            println!("  + {added}");
        }
        for removed in before.iter().filter(|c| !registry.contains(c)) {
            println!("  - {removed}");
        }
    }
    println!("{} collections", registry.collections.len());
    Ok(())
}
