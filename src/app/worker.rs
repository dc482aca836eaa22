use std::fs::{self, File, OpenOptions};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use fs2::FileExt;
use tracing::{debug, error};

use crate::app::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent<T> {
    Progress(String),
    Done(T),
    Failed(AppError),
}

pub type ProgressEmitter = Arc<dyn Fn(String) + Send + Sync>;

/// Append-only progress channel handed to a running job.
#[derive(Clone)]
pub struct ProgressSink {
    emitter: ProgressEmitter,
}

impl ProgressSink {
    pub fn new(emitter: ProgressEmitter) -> Self {
        Self { emitter }
    }

    fn channel<T: Send + 'static>(sender: Sender<WorkerEvent<T>>) -> Self {
        // The receiver may have gone away; progress is best effort.
        Self::new(Arc::new(move |message| {
            let _ = sender.send(WorkerEvent::Progress(message));
        }))
    }

    /// Records messages into a shared buffer, for running a job inline.
    pub fn collecting() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let target = Arc::clone(&lines);
        let sink = Self::new(Arc::new(move |message| {
            if let Ok(mut lines) = target.lock() {
                lines.push(message);
            }
        }));
        (sink, lines)
    }

    pub fn emit(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(progress = %message);
        (self.emitter)(message);
    }
}

/// Receiving end of a started job: progress lines, then exactly one `Done` or `Failed`.
pub struct WorkerHandle<T> {
    events: Receiver<WorkerEvent<T>>,
    thread: Option<JoinHandle<()>>,
    trace_id: String,
}

impl<T> WorkerHandle<T> {
    pub fn recv(&self) -> Option<WorkerEvent<T>> {
        self.events.recv().ok()
    }

    /// Feeds progress to `on_progress` and returns the terminal result.
    pub fn wait(mut self, mut on_progress: impl FnMut(&str)) -> Result<T, AppError> {
        let mut outcome = None;
        while let Ok(event) = self.events.recv() {
            match event {
                WorkerEvent::Progress(line) => on_progress(&line),
                WorkerEvent::Done(value) => outcome = Some(Ok(value)),
                WorkerEvent::Failed(err) => outcome = Some(Err(err)),
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        outcome.unwrap_or_else(|| {
            Err(AppError::system(
                "Worker exited without a result",
                &self.trace_id,
            ))
        })
    }
}

/// One job at a time. A second `start` while busy is rejected, never queued.
///
/// With a lock file the rule also holds across processes: the running job keeps an exclusive
/// lock on it until it finishes.
pub struct WorkerSlot {
    name: &'static str,
    busy: Arc<AtomicBool>,
    lock_path: Option<PathBuf>,
}

impl WorkerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            busy: Arc::new(AtomicBool::new(false)),
            lock_path: None,
        }
    }

    pub fn with_lock_file(name: &'static str, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            lock_path: Some(lock_path.into()),
            ..Self::new(name)
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn start<T, F>(&self, trace_id: &str, job: F) -> Result<WorkerHandle<T>, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressSink) -> Result<T, AppError> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(self.already_running(trace_id));
        }
        let mut busy = BusyGuard {
            busy: Arc::clone(&self.busy),
            lock: None,
        };
        if let Some(path) = &self.lock_path {
            busy.lock = Some(self.acquire_lock(path, trace_id)?);
        }

        let (sender, events) = mpsc::channel();
        let name = self.name;
        let trace_id = trace_id.to_string();
        let handle_trace_id = trace_id.clone();

        let spawned = thread::Builder::new()
            .name(format!("{name}-worker"))
            .spawn(move || {
                let _busy = busy;
                let sink = ProgressSink::channel(sender.clone());
                let result = panic::catch_unwind(AssertUnwindSafe(|| job(&sink)));
                let event = match result {
                    Ok(Ok(value)) => WorkerEvent::Done(value),
                    Ok(Err(err)) => WorkerEvent::Failed(err),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(trace_id = %trace_id, worker = name, error = %message, "worker panicked");
                        WorkerEvent::Failed(AppError::system(message, &trace_id))
                    }
                };
                let _ = sender.send(event);
            });

        match spawned {
            Ok(thread) => Ok(WorkerHandle {
                events,
                thread: Some(thread),
                trace_id: handle_trace_id,
            }),
            // The closure and its BusyGuard are dropped here, so the slot is free again.
            Err(err) => Err(AppError::system(
                format!("Failed to start {} worker: {err}", self.name),
                handle_trace_id,
            )),
        }
    }

    fn already_running(&self, trace_id: &str) -> AppError {
        AppError::validation(
            format!("{} task is already running, please wait", self.name),
            trace_id,
        )
    }

    /// An error here drops the caller's guard, which clears `busy` again.
    fn acquire_lock(&self, path: &Path, trace_id: &str) -> Result<File, AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                AppError::system(format!("Failed to create {}: {err}", parent.display()), trace_id)
            })?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| {
                AppError::system(format!("Failed to open {}: {err}", path.display()), trace_id)
            })?;
        if file.try_lock_exclusive().is_err() {
            debug!(trace_id = %trace_id, worker = self.name, path = %path.display(), "lock held elsewhere");
            return Err(self.already_running(trace_id));
        }
        Ok(file)
    }
}

/// Clears the busy flag and releases the lock file when the job's thread ends.
struct BusyGuard {
    busy: Arc<AtomicBool>,
    lock: Option<File>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.lock {
            let _ = FileExt::unlock(file);
        }
        self.busy.store(false, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "worker panicked".to_string()
}
