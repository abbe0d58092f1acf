//! The default-database descriptor in `<data_dir>/config.json`.
//!
//! The descriptor has the registry shape (`{"name", "collections"}`) and
//! names the database a process should use when none is given explicitly.
//! The store selects a database from `create_database` and `connect`; the
//! collection list is refreshed whenever the selected database's registry
//! changes.

use crate::context::StoreContext;
use crate::error::CoreResult;
use crate::lock::LockMode;
use crate::registry::Registry;
use tracing::debug;

/// Reads the recorded selection, if any.
///
/// # Errors
///
/// Returns `Corruption` if `config.json` exists but does not parse.
pub(crate) fn load(ctx: &StoreContext) -> CoreResult<Option<Registry>> {
    let path = ctx.layout.config_file();
    let _guard = ctx.locks.acquire(&path, None, LockMode::Shared)?;

    match ctx.backend.read(&path)? {
        Some(data) => Ok(Some(Registry::decode(&data, &path)?)),
        None => Ok(None),
    }
}

/// Records `registry` as the selected database.
pub(crate) fn record(ctx: &StoreContext, registry: &Registry) -> CoreResult<()> {
    let path = ctx.layout.config_file();
    let _guard = ctx.locks.acquire(&path, None, LockMode::Exclusive)?;

    ctx.write_file(&path, &ctx.encode(registry)?)?;
    debug!(database = %registry.name, "selection recorded");
    Ok(())
}

/// Rewrites the descriptor with `registry` if it names the same database.
///
/// Never changes which database is selected.
pub(crate) fn refresh(ctx: &StoreContext, registry: &Registry) -> CoreResult<()> {
    let path = ctx.layout.config_file();
    let _guard = ctx.locks.acquire(&path, None, LockMode::Exclusive)?;

    let Some(data) = ctx.backend.read(&path)? else {
        return Ok(());
    };
    let current = Registry::decode(&data, &path)?;
    if current.name != registry.name || current == *registry {
        return Ok(());
    }

    ctx.write_file(&path, &ctx.encode(registry)?)?;
    debug!(database = %registry.name, "selection refreshed");
    Ok(())
}
