//! Named serial dispatch queues.
//!
//! A [`Queue`] is a FIFO execution context backed by a single worker thread.
//! Queues are the unit of scheduling affinity for the effect system: an
//! effect is always evaluated "on" a queue, `continue_on` relocates the rest
//! of an evaluation to another queue, and parallel branches run on ephemeral
//! queues derived from their parent.
//!
//! Jobs submitted to one queue execute in submission order. Submitting from
//! the queue's own worker thread with [`Queue::sync`] runs the job inline,
//! which both avoids a pointless context switch and makes re-entrant
//! dispatch deadlock-free.
//!
//! # Examples
//!
//! ```rust
//! use dispatchio::queue::{Priority, Queue};
//!
//! let queue = Queue::new("worker", Priority::Default);
//! let value = queue.sync(|| 21 * 2);
//! assert_eq!(value, 42);
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, OnceLock};

/// Priority class of a queue.
///
/// Purely descriptive metadata mirrored onto derived queues; no OS-level
/// scheduling priority is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Housekeeping work that should yield to everything else.
    Background,
    /// The ordinary priority class.
    #[default]
    Default,
    /// Latency-sensitive work.
    High,
}

type Job = Box<dyn FnOnce() + Send>;

thread_local! {
    static CURRENT_QUEUE: Cell<Option<u64>> = const { Cell::new(None) };
}

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(0);

struct QueueCore {
    id: u64,
    label: String,
    priority: Priority,
    jobs: mpsc::Sender<Job>,
}

/// A named serial FIFO execution context.
///
/// `Queue` is a cheap cloneable handle; all clones refer to the same worker
/// thread. The worker shuts down when the last handle is dropped. Identity
/// (used by the affinity check) is per-queue, not per-label: two queues may
/// share a label for diagnostic purposes without being confused for one
/// another.
///
/// # Examples
///
/// ```rust
/// use dispatchio::queue::{Priority, Queue};
///
/// let queue = Queue::new("example", Priority::High);
/// assert_eq!(queue.label(), "example");
/// assert_eq!(queue.priority(), Priority::High);
/// ```
#[derive(Clone)]
pub struct Queue {
    core: Arc<QueueCore>,
}

impl Queue {
    /// Creates a new serial queue with its own worker thread.
    ///
    /// The worker thread is named after the label.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread cannot be spawned.
    pub fn new(label: impl Into<String>, priority: Priority) -> Self {
        let label = label.into();
        let id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel::<Job>();

        let worker_label = label.clone();
        std::thread::Builder::new()
            .name(label.clone())
            .spawn(move || worker_loop(id, &worker_label, &receiver))
            .expect("failed to spawn queue worker thread");

        Self {
            core: Arc::new(QueueCore {
                id,
                label,
                priority,
                jobs: sender,
            }),
        }
    }

    /// Returns the process-wide default serial queue, labelled `"main"`.
    ///
    /// Created lazily on first use and shared for the lifetime of the
    /// process. Unlike a platform main queue, it is an ordinary worker
    /// queue with a well-known name.
    pub fn main() -> Self {
        static MAIN: OnceLock<Queue> = OnceLock::new();
        MAIN.get_or_init(|| Self::new("main", Priority::Default)).clone()
    }

    /// The diagnostic label of this queue.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.core.label
    }

    /// The priority class of this queue.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.core.priority
    }

    /// Creates an ephemeral child queue named `label + suffix`, inheriting
    /// this queue's priority.
    ///
    /// Used by parallel composition to give each branch its own
    /// deterministically named queue. The name is purely diagnostic.
    #[must_use]
    pub fn derive(&self, suffix: &str) -> Self {
        Self::new(format!("{}{suffix}", self.core.label), self.core.priority)
    }

    /// Returns `true` if the calling thread is this queue's worker.
    #[must_use]
    pub fn is_current(&self) -> bool {
        CURRENT_QUEUE.with(|current| current.get() == Some(self.core.id))
    }

    /// Submits a job for asynchronous execution in FIFO order.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread has terminated (which only happens after
    /// a previous job panicked — a contract violation, not a typed error).
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        tracing::trace!(queue = %self.core.label, "dispatching job");
        self.core
            .jobs
            .send(Box::new(job))
            .expect("queue worker terminated; a previous job must have panicked");
    }

    /// Runs a job on this queue and blocks until it completes, returning its
    /// result.
    ///
    /// If the calling thread already is this queue's worker, the job runs
    /// inline; dispatching would deadlock and buys nothing.
    ///
    /// # Panics
    ///
    /// Panics if the job panics on the worker, or if the worker has
    /// terminated.
    pub fn sync<T, F>(&self, job: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.is_current() {
            return job();
        }
        let (reply, outcome) = mpsc::sync_channel(1);
        self.dispatch(move || {
            let _ = reply.send(job());
        });
        outcome
            .recv()
            .expect("queue worker dropped a synchronous job without replying")
    }
}

impl PartialEq for Queue {
    fn eq(&self, other: &Self) -> bool {
        self.core.id == other.core.id
    }
}

impl Eq for Queue {}

impl fmt::Debug for Queue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Queue")
            .field("label", &self.core.label)
            .field("priority", &self.core.priority)
            .finish()
    }
}

fn worker_loop(id: u64, label: &str, receiver: &mpsc::Receiver<Job>) {
    CURRENT_QUEUE.with(|current| current.set(Some(id)));
    tracing::trace!(queue = %label, "queue worker started");
    while let Ok(job) = receiver.recv() {
        job();
    }
    tracing::trace!(queue = %label, "queue worker stopped");
}
