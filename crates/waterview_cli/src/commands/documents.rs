//! Document commands: insert, get-all, get-where.

use super::{resolve, CommandResult};
use serde_json::Value;
use waterview_core::{DocumentStore, Predicate};

/// Runs `insert`. A JSON array inserts each element, all or nothing.
pub fn insert(store: &DocumentStore, db: Option<&str>, collection: &str, json: &str) -> CommandResult {
    let conn = resolve(store, db)?;
    let documents = parse_documents(json)?;
    let added = store.insert_many(&conn, collection, documents)?;
    println!("Inserted {added} document(s) into {conn}/{collection}");
    Ok(())
}

/// Runs `get-all`.
pub fn get_all(store: &DocumentStore, db: Option<&str>, collection: &str) -> CommandResult {
    let conn = resolve(store, db)?;
    let documents = store.get_all(&conn, collection)?;
    println!("{}", serde_json::to_string_pretty(&documents)?);
    Ok(())
}

/// Runs `get-where`.
pub fn get_where(
    store: &DocumentStore,
    db: Option<&str>,
    collection: &str,
    predicate: &str,
    all: bool,
) -> CommandResult {
    let conn = resolve(store, db)?;
    let predicate = Predicate::from_value(serde_json::from_str(predicate)?)?;

    if all {
        let documents = store.find(&conn, collection, &predicate)?;
        println!("{}", serde_json::to_string_pretty(&documents)?);
    } else {
        match store.get_where(&conn, collection, &predicate)? {
            Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
            None => println!("null"),
        }
    }
    Ok(())
}

fn parse_documents(json: &str) -> Result<Vec<Value>, serde_json::Error> {
    Ok(match serde_json::from_str(json)? {
        Value::Array(items) => items,
        other => vec![other],
    })
}
