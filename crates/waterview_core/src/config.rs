//! Store configuration.

use std::time::Duration;

/// Configuration for opening a document store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Longest time any operation waits for a lock before failing with
    /// `LockTimeout`.
    pub lock_timeout: Duration,

    /// Whether to fsync temporary files and directories on every rewrite
    /// (safer but slower).
    pub sync_writes: bool,

    /// Whether to write JSON files pretty-printed.
    pub pretty: bool,

    /// Whether `create_database` and `connect` record the database in
    /// `config.json` as the default selection.
    pub track_selection: bool,

    /// Whether to additionally take OS advisory file locks, so that several
    /// processes can share one data directory.
    pub cross_process_locks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            sync_writes: true,
            pretty: true,
            track_selection: true,
            cross_process_locks: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lock wait bound.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets whether to fsync on every rewrite.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets whether to pretty-print JSON files.
    #[must_use]
    pub const fn pretty(mut self, value: bool) -> Self {
        self.pretty = value;
        self
    }

    /// Sets whether to record the selected database in `config.json`.
    #[must_use]
    pub const fn track_selection(mut self, value: bool) -> Self {
        self.track_selection = value;
        self
    }

    /// Sets whether to take OS advisory file locks.
    #[must_use]
    pub const fn cross_process_locks(mut self, value: bool) -> Self {
        self.cross_process_locks = value;
        self
    }
}
