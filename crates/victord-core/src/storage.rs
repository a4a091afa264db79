//! Database directory layout: `<root>/<name>/` holding the snapshot, WAL,
//! and default socket endpoint for one database.

use std::{fs, io, os::unix::fs::PermissionsExt, path::PathBuf};

/// Owner-only directory mode applied when a database directory is created.
const OWNER_ONLY_DIR_MODE: u32 = 0o700;

/// Resolved paths for one `<root>/<name>/` database directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    dir: PathBuf,
}

impl Layout {
    /// Resolve the layout for `name` under `root`, creating the directory
    /// with owner-only permissions if it does not already exist.
    ///
    /// # Errors
    ///
    /// Propagates any filesystem error from creating the directory or
    /// setting its permissions.
    pub fn ensure(root: &std::path::Path, name: &str) -> io::Result<Self> {
        let dir = root.join(name);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            fs::set_permissions(&dir, fs::Permissions::from_mode(OWNER_ONLY_DIR_MODE))?;
        }
        Ok(Self { dir })
    }

    /// Path to the vector-index snapshot file.
    #[must_use]
    pub fn index_snapshot(&self) -> PathBuf {
        self.dir.join("db.index")
    }

    /// Path to the key-value snapshot file.
    #[must_use]
    pub fn table_snapshot(&self) -> PathBuf {
        self.dir.join("db.table")
    }

    /// Path to the vector-index WAL file.
    #[must_use]
    pub fn index_wal(&self) -> PathBuf {
        self.dir.join("db.iwal")
    }

    /// Path to the key-value WAL file.
    #[must_use]
    pub fn table_wal(&self) -> PathBuf {
        self.dir.join("db.twal")
    }

    /// Path to the default listen endpoint, used when no `-u` override is
    /// given on the command line.
    #[must_use]
    pub fn default_socket(&self) -> PathBuf {
        self.dir.join("socket.unix")
    }
}

/// Remove a stale Unix-domain socket file before binding, if one is present.
///
/// Only ever called for the *default* endpoint path: an operator-supplied
/// `-u` path is never unlinked automatically, since it may point at
/// something the operator manages themselves.
///
/// # Errors
///
/// Propagates any filesystem error other than the file not existing.
pub fn unlink_stale_socket(path: &std::path::Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn ensure_creates_owner_only_directory() {
        let root = tempdir().unwrap();
        let layout = Layout::ensure(root.path(), "mydb").unwrap();

        let meta = fs::metadata(root.path().join("mydb")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, OWNER_ONLY_DIR_MODE);
        assert_eq!(layout.index_snapshot(), root.path().join("mydb/db.index"));
        assert_eq!(layout.default_socket(), root.path().join("mydb/socket.unix"));
    }

    #[test]
    fn ensure_is_idempotent() {
        let root = tempdir().unwrap();
        Layout::ensure(root.path(), "mydb").unwrap();
        Layout::ensure(root.path(), "mydb").unwrap();
    }

    #[test]
    fn unlink_stale_socket_tolerates_missing_file() {
        let root = tempdir().unwrap();
        unlink_stale_socket(&root.path().join("nope")).unwrap();
    }

    #[test]
    fn unlink_stale_socket_removes_existing_file() {
        let root = tempdir().unwrap();
        let path = root.path().join("socket.unix");
        fs::write(&path, b"").unwrap();
        unlink_stale_socket(&path).unwrap();
        assert!(!path.exists());
    }
}
