//! Host Schedulers
//!
//! Effects created with a scheduler hand every rerun to it as a [`Job`]
//! instead of running synchronously. The runtime itself never queues; the
//! two schedulers here are the batching strategies hosts most often want.
//!
//! # Queue Semantics
//!
//! 1. Jobs are keyed by effect, so an effect triggered many times before a
//!    flush runs once.
//!
//! 2. A flush runs jobs in the order their effects were first queued. Jobs
//!    queued while the flush is running join the same flush.
//!
//! 3. Jobs belonging to effects stopped before the flush reaches them are
//!    dropped without running.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::reactive::{EffectId, Job};

#[derive(Default)]
struct QueueInner {
    pending: RefCell<IndexMap<EffectId, Job>>,
    flushing: Cell<bool>,
}

impl QueueInner {
    fn push(&self, job: Job) -> bool {
        let mut pending = self.pending.borrow_mut();
        if pending.contains_key(&job.id()) {
            return false;
        }
        pending.insert(job.id(), job);
        true
    }

    fn flush(&self) -> usize {
        if self.flushing.replace(true) {
            return 0;
        }
        let _guard = FlushGuard(&self.flushing);

        let mut ran = 0;
        let mut skipped = 0;
        loop {
            let next = self.pending.borrow_mut().shift_remove_index(0);
            let Some((_, job)) = next else {
                break;
            };
            if job.is_active() {
                job.run();
                ran += 1;
            } else {
                skipped += 1;
            }
        }

        tracing::debug!(ran, skipped, "flushed job queue");
        ran
    }
}

struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A batched queue of effect reruns.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::{Effect, EffectOptions, Ref};
/// use weft_core::scheduler::JobQueue;
///
/// let queue = JobQueue::new();
/// let count = Ref::new(0);
///
/// let count_clone = count.clone();
/// let effect = Effect::with_options(
///     move || {
///         count_clone.get();
///     },
///     EffectOptions::new().scheduler(queue.scheduler()),
/// );
///
/// count.set(1);
/// count.set(2);
/// assert_eq!(effect.run_count(), 1);
///
/// queue.flush();
/// assert_eq!(effect.run_count(), 2);
/// ```
#[derive(Clone, Default)]
pub struct JobQueue {
    inner: Rc<QueueInner>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler that queues jobs here. It holds the queue weakly; once the
    /// queue is dropped, jobs are discarded.
    pub fn scheduler(&self) -> impl Fn(Job) + 'static {
        let queue: Weak<QueueInner> = Rc::downgrade(&self.inner);
        move |job| {
            if let Some(queue) = queue.upgrade() {
                queue.push(job);
            }
        }
    }

    /// Queue a job. Returns false if its effect was already queued.
    pub fn push(&self, job: Job) -> bool {
        self.inner.push(job)
    }

    /// Run every queued job, including jobs queued during the flush.
    ///
    /// Returns the number of jobs run. A flush started from inside a running
    /// flush does nothing.
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    pub fn len(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending", &self.len())
            .field("flushing", &self.is_flushing())
            .finish()
    }
}

/// Defers reruns to the next tick of a tokio [`LocalSet`].
///
/// The first job queued in a tick spawns one local task that flushes the
/// queue; later jobs in the same tick join that flush.
///
/// [`LocalSet`]: tokio::task::LocalSet
#[derive(Clone, Default)]
pub struct TickScheduler {
    queue: JobQueue,
    scheduled: Rc<Cell<bool>>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler that defers jobs to the next tick.
    ///
    /// # Panics
    ///
    /// The returned scheduler panics when called outside a `LocalSet`.
    pub fn scheduler(&self) -> impl Fn(Job) + 'static {
        let queue = Rc::downgrade(&self.queue.inner);
        let scheduled = Rc::clone(&self.scheduled);
        move |job| {
            let Some(queue) = queue.upgrade() else {
                return;
            };
            queue.push(job);
            if scheduled.replace(true) {
                return;
            }

            let scheduled = Rc::clone(&scheduled);
            tokio::task::spawn_local(async move {
                scheduled.set(false);
                queue.flush();
            });
        }
    }

    /// True while a flush is spawned but has not run yet.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.get()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("queue", &self.queue)
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}
