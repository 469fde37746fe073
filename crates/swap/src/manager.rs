// Chunk: docs/chunks/swap_journal - Crash-recovery journal for buffer edits

//! The swap manager: a record queue shared with one writer thread.
//!
//! Producers encode records and push them under the queue lock, then wake
//! the writer. The writer swaps the whole queue out, writes each frame to
//! its buffer's sidecar, flushes, and issues a durable flush on any sidecar
//! whose last one is older than `fsync_interval_ms`.
//!
//! Per-buffer order is the order of the producer calls, since pushes happen
//! under the lock and the writer drains in FIFO order. Sidecar paths are
//! resolved when a batch is drained, so frames queued before a rename land
//! in the new sidecar.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::SwapConfig;
use crate::error::Result;
use crate::record::{Record, MAX_PAYLOAD_LEN};
use crate::recorder::SwapRecorder;
use crate::sidecar::{sidecar_path, BufferId, Journaled, Sidecar};

/// Largest text carried by one INS frame; leaves room for three varints.
const MAX_INSERT_CHUNK: usize = MAX_PAYLOAD_LEN - 30;

enum Pending {
    Frame { buffer: BufferId, frame: Vec<u8> },
    /// Close the buffer's sidecar once everything queued before it is written.
    Close(BufferId),
    /// Like `Close`, and the buffer's entry is forgotten once drained.
    Detach(BufferId),
}

impl Pending {
    fn buffer(&self) -> BufferId {
        match self {
            Pending::Frame { buffer, .. } | Pending::Close(buffer) | Pending::Detach(buffer) => {
                *buffer
            }
        }
    }
}

#[derive(Debug, Default)]
struct BufferState {
    /// Unset until the buffer is attached or first recorded.
    path: Option<PathBuf>,
    suspended: bool,
}

#[derive(Default)]
struct Shared {
    queue: VecDeque<Pending>,
    buffers: HashMap<BufferId, BufferState>,
    /// Items ever pushed onto `queue`.
    enqueued: u64,
    /// Items the writer has finished with.
    written: u64,
}

impl Shared {
    fn register(&mut self, buf: &dyn Journaled) -> &mut BufferState {
        let id = buf.buffer_id();
        let state = self.buffers.entry(id).or_default();
        if state.path.is_none() {
            state.path = Some(sidecar_path(id, buf.filename()));
        }
        state
    }

    fn push(&mut self, pending: Pending) {
        self.queue.push_back(pending);
        self.enqueued += 1;
    }
}

struct Inner {
    shared: Mutex<Shared>,
    /// Signals the writer: new work or shutdown.
    wake: Condvar,
    /// Signals `flush` callers: a batch was written.
    drained: Condvar,
    running: AtomicBool,
    config: SwapConfig,
}

/// Owns the writer thread and the per-buffer journal state.
///
/// Dropping the manager stops the writer after it drains the queue, then
/// every open sidecar is flushed, synced and closed.
pub struct SwapManager {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl SwapManager {
    pub fn new() -> Result<Self> {
        Self::with_config(SwapConfig::default())
    }

    pub fn with_config(config: SwapConfig) -> Result<Self> {
        let inner = Arc::new(Inner {
            shared: Mutex::new(Shared::default()),
            wake: Condvar::new(),
            drained: Condvar::new(),
            running: AtomicBool::new(true),
            config,
        });

        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("kte-swap".to_string())
            .spawn(move || run_writer(&worker_inner))?;

        Ok(Self {
            inner,
            worker: Some(worker),
        })
    }

    pub fn config(&self) -> SwapConfig {
        self.inner.config
    }

    /// Registers the buffer's sidecar path. Idempotent; the suspension flag
    /// is left as it is.
    pub fn attach(&self, buf: &dyn Journaled) {
        let id = buf.buffer_id();
        let mut shared = self.inner.shared.lock();
        shared.buffers.entry(id).or_default().path = Some(sidecar_path(id, buf.filename()));
    }

    /// Closes the buffer's sidecar after its queued records are written.
    ///
    /// The writer drops the buffer's path entry when it drains the detach,
    /// unless the buffer is suspended or has records queued behind it. A
    /// later record registers the buffer again and appends to the sidecar.
    pub fn detach(&self, buf: &dyn Journaled) {
        let id = buf.buffer_id();
        let mut shared = self.inner.shared.lock();
        if !shared.buffers.contains_key(&id) {
            return;
        }
        shared.push(Pending::Detach(id));
        drop(shared);
        self.inner.wake.notify_one();
    }

    /// The sidecar path currently registered for `buffer`.
    pub fn sidecar_path(&self, buffer: BufferId) -> Option<PathBuf> {
        self.inner
            .shared
            .lock()
            .buffers
            .get(&buffer)
            .and_then(|state| state.path.clone())
    }

    /// Waits until everything queued before this call has been handed to
    /// the kernel. Returns false if `timeout` elapsed first.
    ///
    /// This is not a durable flush; that still happens on the fsync
    /// interval and at shutdown.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut shared = self.inner.shared.lock();
        let target = shared.enqueued;
        self.inner.wake.notify_one();
        while shared.written < target {
            if self
                .inner
                .drained
                .wait_until(&mut shared, deadline)
                .timed_out()
            {
                return shared.written >= target;
            }
        }
        true
    }

    fn enqueue(&self, buf: &dyn Journaled, records: Vec<Record>) {
        let id = buf.buffer_id();
        let mut guard = self.inner.shared.lock();
        let shared = &mut *guard;
        if shared.register(buf).suspended {
            return;
        }
        for record in records {
            match record.to_frame() {
                Ok(frame) => shared.push(Pending::Frame { buffer: id, frame }),
                Err(err) => log::warn!("dropping swap record for buffer {}: {}", id, err),
            }
        }
        drop(guard);
        self.inner.wake.notify_one();
    }
}

impl SwapRecorder for SwapManager {
    fn record_insert(&self, buf: &dyn Journaled, row: usize, col: usize, text: &[u8]) {
        self.enqueue(buf, insert_records(row, col, text));
    }

    fn record_delete(&self, buf: &dyn Journaled, row: usize, col: usize, len: usize) {
        self.enqueue(buf, vec![Record::Delete { row, col, len }]);
    }

    fn record_split(&self, buf: &dyn Journaled, row: usize, col: usize) {
        self.enqueue(buf, vec![Record::Split { row, col }]);
    }

    fn record_join(&self, buf: &dyn Journaled, row: usize) {
        self.enqueue(buf, vec![Record::Join { row }]);
    }

    fn notify_filename_changed(&self, buf: &dyn Journaled) {
        let id = buf.buffer_id();
        let new_path = sidecar_path(id, buf.filename());
        let mut shared = self.inner.shared.lock();
        let state = shared.buffers.entry(id).or_default();
        if state.path.as_ref() == Some(&new_path) {
            return;
        }
        log::debug!("buffer {} journal moves to {}", id, new_path.display());
        state.path = Some(new_path);
        shared.push(Pending::Close(id));
        drop(shared);
        self.inner.wake.notify_one();
    }

    fn set_suspended(&self, buffer: BufferId, suspended: bool) -> bool {
        let mut shared = self.inner.shared.lock();
        let state = shared.buffers.entry(buffer).or_default();
        std::mem::replace(&mut state.suspended, suspended)
    }

    fn is_suspended(&self, buffer: BufferId) -> bool {
        self.inner
            .shared
            .lock()
            .buffers
            .get(&buffer)
            .is_some_and(|state| state.suspended)
    }
}

impl Drop for SwapManager {
    fn drop(&mut self) {
        {
            // Cleared under the lock so the writer cannot miss the wakeup.
            let _shared = self.inner.shared.lock();
            self.inner.running.store(false, Ordering::Release);
        }
        self.inner.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("swap writer thread panicked");
            }
        }
    }
}

/// Splits an insert into frames that fit the 24-bit payload limit, advancing
/// (row, col) across each chunk so replay lands every piece in place.
fn insert_records(mut row: usize, mut col: usize, text: &[u8]) -> Vec<Record> {
    if text.is_empty() {
        return vec![Record::Insert {
            row,
            col,
            bytes: Vec::new(),
        }];
    }
    let mut records = Vec::with_capacity(text.len().div_ceil(MAX_INSERT_CHUNK));
    for chunk in text.chunks(MAX_INSERT_CHUNK) {
        records.push(Record::Insert {
            row,
            col,
            bytes: chunk.to_vec(),
        });
        match chunk.iter().rposition(|&b| b == b'\n') {
            Some(last_newline) => {
                row += chunk.iter().filter(|&&b| b == b'\n').count();
                col = chunk.len() - last_newline - 1;
            }
            None => col += chunk.len(),
        }
    }
    records
}

fn run_writer(inner: &Inner) {
    log::debug!("swap writer started");
    let mut writer = Writer::default();
    let fsync_interval = inner.config.fsync_interval();

    loop {
        let (batch, paths, target, running) = {
            let mut shared = inner.shared.lock();
            if shared.queue.is_empty() && inner.running.load(Ordering::Acquire) {
                inner
                    .wake
                    .wait_for(&mut shared, inner.config.flush_interval());
            }
            let batch: Vec<Pending> = shared.queue.drain(..).collect();
            let paths: HashMap<BufferId, PathBuf> = batch
                .iter()
                .filter_map(|pending| {
                    let id = pending.buffer();
                    let path = shared.buffers.get(&id)?.path.clone()?;
                    Some((id, path))
                })
                .collect();
            forget_detached(&mut shared.buffers, &batch);
            let running = inner.running.load(Ordering::Acquire);
            (batch, paths, shared.enqueued, running)
        };

        for pending in batch {
            writer.write_pending(pending, &paths);
        }
        for sidecar in writer.sidecars.values_mut() {
            if let Err(err) = sidecar.flush() {
                log::warn!("failed to flush sidecar {}: {}", sidecar.path().display(), err);
            }
            if sidecar.sync_due(fsync_interval) {
                if let Err(err) = sidecar.sync() {
                    log::warn!("failed to sync sidecar {}: {}", sidecar.path().display(), err);
                }
            }
        }

        inner.shared.lock().written = target;
        inner.drained.notify_all();

        if !running {
            break;
        }
    }

    for (_, sidecar) in writer.sidecars.drain() {
        sidecar.close();
    }
    log::debug!("swap writer stopped");
}

/// Drops path entries for buffers detached in `batch`. A buffer that is
/// suspended, or that has items queued after its detach, keeps its entry.
fn forget_detached(buffers: &mut HashMap<BufferId, BufferState>, batch: &[Pending]) {
    for (i, pending) in batch.iter().enumerate() {
        let Pending::Detach(id) = pending else {
            continue;
        };
        let requeued = batch[i + 1..].iter().any(|later| later.buffer() == *id);
        if !requeued && buffers.get(id).is_some_and(|state| !state.suspended) {
            buffers.remove(id);
        }
    }
}

/// State owned by the writer thread.
#[derive(Default)]
struct Writer {
    sidecars: HashMap<BufferId, Sidecar>,
    /// Paths that failed to open, skipped until the buffer is closed,
    /// detached or renamed.
    failed: HashMap<BufferId, PathBuf>,
}

impl Writer {
    fn write_pending(&mut self, pending: Pending, paths: &HashMap<BufferId, PathBuf>) {
        let (buffer, frame) = match pending {
            Pending::Close(buffer) | Pending::Detach(buffer) => {
                self.failed.remove(&buffer);
                if let Some(sidecar) = self.sidecars.remove(&buffer) {
                    sidecar.close();
                }
                return;
            }
            Pending::Frame { buffer, frame } => (buffer, frame),
        };
        let Some(path) = paths.get(&buffer) else {
            return;
        };
        if self.failed.get(&buffer) == Some(path) {
            return;
        }

        // The buffer was renamed since its sidecar was opened.
        if self
            .sidecars
            .get(&buffer)
            .is_some_and(|sidecar| sidecar.path() != path.as_path())
        {
            if let Some(old) = self.sidecars.remove(&buffer) {
                old.close();
            }
        }

        let sidecar = match self.sidecars.entry(buffer) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match Sidecar::open(path) {
                Ok(sidecar) => {
                    self.failed.remove(&buffer);
                    entry.insert(sidecar)
                }
                Err(err) => {
                    log::warn!(
                        "not journaling buffer {}: cannot open {}: {}",
                        buffer,
                        path.display(),
                        err
                    );
                    self.failed.insert(buffer, path.clone());
                    return;
                }
            },
        };
        if let Err(err) = sidecar.append(&frame) {
            log::warn!(
                "failed to write swap record to {}: {}",
                sidecar.path().display(),
                err
            );
        }
    }
}
