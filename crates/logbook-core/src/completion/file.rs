//! Sidecar reader over the journal directory.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::trace;

use super::{SidecarError, SidecarKind, SidecarReader, SidecarSnapshot};
use crate::lock::{LockError, SidecarReadLock};

/// Reads `<dir>/<kind file name>` under a shared advisory lock.
///
/// A file that does not exist, is empty (the producer truncated it and has
/// not finished writing), or is held exclusively past the lock timeout is
/// reported as unavailable rather than as a hard failure.
#[derive(Debug, Clone)]
pub struct FileSidecarReader {
    dir: PathBuf,
    lock_timeout: Duration,
}

impl FileSidecarReader {
    /// Default time to wait for a producer's exclusive lock.
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

    /// Reader over `dir` with the default lock timeout.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override the lock timeout.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Directory holding the sidecar files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the sidecar for `kind`.
    #[must_use]
    pub fn path_for(&self, kind: SidecarKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

impl SidecarReader for FileSidecarReader {
    fn read(&self, kind: SidecarKind) -> Result<Option<SidecarSnapshot>, SidecarError> {
        let path = self.path_for(kind);
        let lock = match SidecarReadLock::acquire(&path, self.lock_timeout) {
            Ok(lock) => lock,
            Err(LockError::IoError(err)) if err.kind() == io::ErrorKind::NotFound => {
                trace!(path = %path.display(), "sidecar absent");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let io_err = |source| SidecarError::Io {
            path: path.clone(),
            source,
        };
        let bytes = fs::read(&path).map_err(io_err)?;
        let modified = fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        lock.release();

        if bytes.iter().all(u8::is_ascii_whitespace) {
            trace!(path = %path.display(), "sidecar empty");
            return Ok(None);
        }
        SidecarSnapshot::from_bytes(kind, &bytes, modified).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs2::FileExt;

    #[test]
    fn absent_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reader = FileSidecarReader::new(dir.path());
        assert!(reader.read(SidecarKind::Market).expect("read").is_none());
    }

    #[test]
    fn empty_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("NavRoute.json"), "  \n").expect("write");
        let reader = FileSidecarReader::new(dir.path());
        assert!(reader.read(SidecarKind::NavRoute).expect("read").is_none());
    }

    #[test]
    fn reads_snapshot_with_json_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("Market.json"),
            r#"{"timestamp":"2023-01-01T10:00:01Z","MarketID":7,"Items":[]}"#,
        )
        .expect("write");
        let reader = FileSidecarReader::new(dir.path());
        let snap = reader.read(SidecarKind::Market).expect("read").expect("present");
        assert_eq!(snap.market_id(), Some(7));
        assert_eq!(
            snap.timestamp(),
            crate::record::parse_timestamp("2023-01-01T10:00:01Z")
        );
    }

    #[test]
    fn falls_back_to_modification_time() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("NavRoute.json"), r#"{"Route":[]}"#).expect("write");
        let reader = FileSidecarReader::new(dir.path());
        let snap = reader.read(SidecarKind::NavRoute).expect("read").expect("present");
        assert!(snap.timestamp().is_some());
    }

    #[test]
    fn held_file_times_out_as_lock_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Outfitting.json");
        fs::write(&path, "{}").expect("write");
        let writer = fs::OpenOptions::new().write(true).open(&path).expect("open");
        writer.lock_exclusive().expect("lock");
        let reader =
            FileSidecarReader::new(dir.path()).with_lock_timeout(Duration::from_millis(20));
        let err = reader.read(SidecarKind::Outfitting).unwrap_err();
        assert!(matches!(err, SidecarError::Lock(LockError::Timeout { .. })));
    }
}
