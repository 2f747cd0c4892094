//! Append-only writer for log files.

use super::{PipelineStats, WriteItem, Worker, offer};
use crate::error::{EnqueueError, WriteError};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable producer side of the raw write queue.
#[derive(Clone)]
pub struct RawWriteSender {
    tx: Sender<WriteItem>,
    enqueue_timeout: Duration,
    stats: Arc<PipelineStats>,
}

impl RawWriteSender {
    /// Queue an append of `text` to `path`.
    pub fn enqueue(&self, path: PathBuf, text: String) -> Result<(), EnqueueError> {
        offer(
            &self.tx,
            WriteItem { path, text },
            self.enqueue_timeout,
            &self.stats,
        )
    }
}

/// Bounded queue plus the single thread that owns every log file handle.
pub struct RawWritePipeline {
    sender: RawWriteSender,
    worker: Worker,
}

impl RawWritePipeline {
    pub fn start(
        capacity: usize,
        enqueue_timeout: Duration,
        stats: Arc<PipelineStats>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = bounded(capacity.max(1));
        let worker_stats = Arc::clone(&stats);
        let worker = Worker::spawn("raw-log-writer", move |shutdown| {
            run_writer(rx, shutdown, worker_stats)
        })?;
        Ok(Self {
            sender: RawWriteSender {
                tx,
                enqueue_timeout,
                stats,
            },
            worker,
        })
    }

    pub fn sender(&self) -> RawWriteSender {
        self.sender.clone()
    }

    pub fn enqueue(&self, path: PathBuf, text: String) -> Result<(), EnqueueError> {
        self.sender.enqueue(path, text)
    }

    /// Drain queued items, close every handle, and stop the worker.
    pub fn shutdown(self, timeout: Duration) -> bool {
        self.worker.stop(timeout)
    }
}

fn run_writer(rx: Receiver<WriteItem>, shutdown: Receiver<()>, stats: Arc<PipelineStats>) {
    let mut files = LogFiles::default();
    loop {
        select! {
            recv(rx) -> item => match item {
                Ok(item) => files.write(&item, &stats),
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }
    // Items accepted before shutdown still get written
    for item in rx.try_iter() {
        files.write(&item, &stats);
    }
    files.close_all();
}

/// Open append handles, keyed by path.
#[derive(Default)]
struct LogFiles {
    handles: HashMap<PathBuf, BufWriter<File>>,
}

impl LogFiles {
    fn write(&mut self, item: &WriteItem, stats: &PipelineStats) {
        if item.path.as_os_str().is_empty() || item.text.is_empty() {
            return;
        }
        match self.append(&item.path, &item.text) {
            Ok(()) => PipelineStats::bump(&stats.written),
            Err(e) => {
                // Next item for this path re-opens it
                self.handles.remove(&item.path);
                PipelineStats::bump(&stats.write_errors);
                log::error!("{e}");
            }
        }
    }

    fn append(&mut self, path: &Path, text: &str) -> Result<(), WriteError> {
        let io_err = |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };
        if !self.handles.contains_key(path) {
            let file = open_append(path).map_err(io_err)?;
            log::debug!("Opened log file {}", path.display());
            self.handles
                .insert(path.to_path_buf(), BufWriter::with_capacity(8192, file));
        }
        let Some(writer) = self.handles.get_mut(path) else {
            return Ok(());
        };
        writer.write_all(text.as_bytes()).map_err(io_err)?;
        writer.flush().map_err(io_err)
    }

    fn close_all(&mut self) {
        for (path, mut writer) in self.handles.drain() {
            if let Err(e) = writer.flush() {
                log::warn!("Failed to flush {} on close: {}", path.display(), e);
            }
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_appends_in_order_and_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/a.log");
        let stats = Arc::new(PipelineStats::default());
        let pipeline =
            RawWritePipeline::start(8, Duration::from_millis(100), Arc::clone(&stats)).unwrap();

        pipeline.enqueue(path.clone(), "one\n".into()).unwrap();
        pipeline.enqueue(path.clone(), "two\n".into()).unwrap();
        assert!(pipeline.shutdown(Duration::from_secs(2)));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert_eq!(stats.snapshot().written, 2);
    }

    #[test]
    fn test_empty_items_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.log");
        let stats = Arc::new(PipelineStats::default());
        let pipeline =
            RawWritePipeline::start(8, Duration::from_millis(100), Arc::clone(&stats)).unwrap();

        pipeline.enqueue(path.clone(), String::new()).unwrap();
        pipeline.enqueue(PathBuf::new(), "text".into()).unwrap();
        assert!(pipeline.shutdown(Duration::from_secs(2)));

        assert!(!path.exists());
        assert_eq!(stats.snapshot().written, 0);
        assert_eq!(stats.snapshot().write_errors, 0);
    }

    #[test]
    fn test_write_error_is_counted_and_recovered() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be
        let blocked = dir.path().join("blocked.log");
        std::fs::create_dir(&blocked).unwrap();
        let good = dir.path().join("good.log");

        let stats = Arc::new(PipelineStats::default());
        let pipeline =
            RawWritePipeline::start(8, Duration::from_millis(100), Arc::clone(&stats)).unwrap();
        pipeline.enqueue(blocked, "lost\n".into()).unwrap();
        pipeline.enqueue(good.clone(), "kept\n".into()).unwrap();
        assert!(pipeline.shutdown(Duration::from_secs(2)));

        assert_eq!(std::fs::read_to_string(&good).unwrap(), "kept\n");
        let snap = stats.snapshot();
        assert_eq!(snap.write_errors, 1);
        assert_eq!(snap.written, 1);
    }

    #[test]
    fn test_same_path_reopens_after_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flaky.log");
        std::fs::create_dir(&path).unwrap();

        let stats = Arc::new(PipelineStats::default());
        let pipeline =
            RawWritePipeline::start(8, Duration::from_millis(100), Arc::clone(&stats)).unwrap();
        pipeline.enqueue(path.clone(), "lost\n".into()).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while stats.snapshot().write_errors == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(stats.snapshot().write_errors, 1);

        std::fs::remove_dir(&path).unwrap();
        pipeline.enqueue(path.clone(), "kept\n".into()).unwrap();
        assert!(pipeline.shutdown(Duration::from_secs(2)));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kept\n");
        let snap = stats.snapshot();
        assert_eq!(snap.write_errors, 1);
        assert_eq!(snap.written, 1);
    }
}
