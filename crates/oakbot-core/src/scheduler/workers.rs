//! Side workers: async snapshot writer and debounced profile persistor.
//!
//! All hand-off is by bounded channel with owned data; the workers never
//! touch scheduler state.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A fully-encoded snapshot ready to hit the disk.
#[derive(Debug)]
pub struct SnapshotWriteJob {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Spawns the snapshot writer with a bounded queue.
pub fn spawn_snapshot_writer(
    queue_depth: usize,
) -> (mpsc::Sender<SnapshotWriteJob>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<SnapshotWriteJob>(queue_depth.max(1));
    let handle = tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            if let Err(err) = write_atomic(&job.path, &job.bytes).await {
                warn!(path = %job.path.display(), %err, "snapshot write failed");
            } else {
                debug!(path = %job.path.display(), "snapshot written");
            }
        }
    });
    (tx, handle)
}

/// Latest-wins profile flush request.
#[derive(Debug)]
pub struct ProfileFlushJob {
    pub path: PathBuf,
    pub json: String,
    /// Bypass the debounce (shutdown path).
    pub force: bool,
}

/// Spawns the debounced profile persistor: at most one flush per debounce
/// window, always flushing the newest pending payload.
pub fn spawn_profile_persistor(
    debounce: Duration,
) -> (mpsc::Sender<ProfileFlushJob>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ProfileFlushJob>(8);
    let handle = tokio::spawn(async move {
        let mut last_flush: Option<Instant> = None;
        let mut pending: Option<ProfileFlushJob> = None;

        loop {
            let deadline = match (&pending, last_flush) {
                (Some(_), Some(at)) => Some(at + debounce),
                (Some(_), None) => Some(Instant::now()),
                (None, _) => None,
            };

            tokio::select! {
                job = rx.recv() => {
                    match job {
                        Some(job) if job.force => {
                            flush(&job).await;
                            last_flush = Some(Instant::now());
                            pending = None;
                        }
                        Some(job) => pending = Some(job),
                        None => break,
                    }
                }
                _ = sleep_until_or_pending(deadline) => {
                    if let Some(job) = pending.take() {
                        flush(&job).await;
                        last_flush = Some(Instant::now());
                    }
                }
            }
        }

        // Drain the last pending payload on shutdown.
        if let Some(job) = pending.take() {
            flush(&job).await;
        }
    });
    (tx, handle)
}

async fn sleep_until_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn flush(job: &ProfileFlushJob) {
    if let Err(err) = write_atomic(&job.path, job.json.as_bytes()).await {
        warn!(path = %job.path.display(), %err, "profile flush failed");
    }
}

async fn write_atomic(path: &PathBuf, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
