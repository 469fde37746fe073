// Chunk: docs/chunks/swap_journal - Crash-recovery journal for buffer edits

//! Buffer identity, sidecar naming, and the open sidecar handle owned by the
//! writer thread.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::record::encode_header;
use crate::recovery::parse_journal;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a journaled buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    /// Hands out a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A buffer whose edits can be journaled.
pub trait Journaled {
    fn buffer_id(&self) -> BufferId;

    /// The file backing the buffer, or `None` for an unnamed buffer.
    fn filename(&self) -> Option<&Path>;
}

/// Where the sidecar for a buffer lives.
///
/// `/dir/name` maps to `/dir/.name.kte.swp`. Unnamed buffers (and paths
/// without a final component) go to `$TMPDIR/kte/unnamed-<pid>-<id>.kte.swp`.
pub fn sidecar_path(id: BufferId, filename: Option<&Path>) -> PathBuf {
    if let Some(path) = filename {
        if let Some(name) = path.file_name() {
            let mut sidecar_name = std::ffi::OsString::from(".");
            sidecar_name.push(name);
            sidecar_name.push(".kte.swp");
            return match path.parent() {
                Some(parent) => parent.join(sidecar_name),
                None => PathBuf::from(sidecar_name),
            };
        }
    }
    std::env::temp_dir().join("kte").join(format!(
        "unnamed-{}-{}.kte.swp",
        std::process::id(),
        id
    ))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// An open sidecar. Only the writer thread holds these.
pub(crate) struct Sidecar {
    path: PathBuf,
    writer: BufWriter<File>,
    /// Bytes written since the last durable flush.
    unsynced: bool,
    last_sync: Instant,
}

impl Sidecar {
    /// Opens or creates the sidecar at `path` for appending.
    ///
    /// A new (or empty) file gets a fresh header. An existing file must carry
    /// a valid header; a torn tail left by a crash is cut off so that new
    /// frames follow the last good one.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;

        let existing_len = file.metadata()?.len();
        if existing_len == 0 {
            file.write_all(&encode_header(unix_now()))?;
            log::debug!("created sidecar {}", path.display());
        } else {
            let mut contents = Vec::with_capacity(existing_len as usize);
            file.read_to_end(&mut contents)?;
            let journal = parse_journal(&contents)?;
            if journal.torn_tail {
                log::warn!(
                    "sidecar {} has a torn tail, truncating {} -> {} bytes",
                    path.display(),
                    existing_len,
                    journal.valid_len
                );
                file.set_len(journal.valid_len)?;
            }
            file.seek(SeekFrom::End(0))?;
            log::debug!("reopened sidecar {}", path.display());
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            unsynced: true,
            last_sync: Instant::now(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one complete frame.
    pub(crate) fn append(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.unsynced = true;
        self.writer.write_all(frame)
    }

    /// Hands buffered frames to the kernel.
    pub(crate) fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    /// Durable flush, if anything was written since the last one.
    pub(crate) fn sync(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;
        if self.unsynced {
            self.writer.get_ref().sync_data()?;
            self.unsynced = false;
        }
        self.last_sync = Instant::now();
        Ok(())
    }

    pub(crate) fn sync_due(&self, interval: std::time::Duration) -> bool {
        self.unsynced && self.last_sync.elapsed() >= interval
    }

    /// Flushes, syncs and closes. Failures are logged and swallowed.
    pub(crate) fn close(mut self) {
        if let Err(err) = self.sync() {
            log::warn!("failed to sync sidecar {}: {}", self.path.display(), err);
        }
        log::debug!("closed sidecar {}", self.path.display());
    }
}
