//! Environment-driven configuration, read once at startup.

use std::{env, path::PathBuf};

/// Default database root when `VICTOR_DB_ROOT` is unset.
pub const DEFAULT_DB_ROOT: &str = "/var/lib/victord";

/// Default checkpoint threshold when `VICTOR_EXPORT_THRESHOLD` is unset.
pub const DEFAULT_EXPORT_THRESHOLD: u64 = 10;

/// Default bound on simultaneous client connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 128;

/// Resolved configuration shared by both server binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Root directory under which `<name>/` database directories live.
    pub db_root: PathBuf,
    /// Mutation count at which a checkpoint is attempted.
    pub export_threshold: u64,
}

impl EnvConfig {
    /// Read `VICTOR_DB_ROOT` and `VICTOR_EXPORT_THRESHOLD` from the process
    /// environment, falling back to their documented defaults.
    ///
    /// An `VICTOR_EXPORT_THRESHOLD` that fails to parse as an integer is
    /// treated the same as unset, with a logged warning. A malformed
    /// override should not prevent the server from starting.
    #[must_use]
    pub fn from_env() -> Self {
        let db_root = env::var_os("VICTOR_DB_ROOT").map_or_else(|| PathBuf::from(DEFAULT_DB_ROOT), PathBuf::from);

        let export_threshold = match env::var("VICTOR_EXPORT_THRESHOLD") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "VICTOR_EXPORT_THRESHOLD is not a valid integer, using default");
                DEFAULT_EXPORT_THRESHOLD
            }),
            Err(_) => DEFAULT_EXPORT_THRESHOLD,
        };

        Self { db_root, export_threshold }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self { db_root: PathBuf::from(DEFAULT_DB_ROOT), export_threshold: DEFAULT_EXPORT_THRESHOLD }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_defaults() {
        let config = EnvConfig::default();
        assert_eq!(config.db_root, PathBuf::from(DEFAULT_DB_ROOT));
        assert_eq!(config.export_threshold, DEFAULT_EXPORT_THRESHOLD);
    }
}
