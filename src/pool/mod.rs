// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Named worker thread pool for asynchronous hooks and events.
//!
//! ```text
//! submit_as(subject, job)
//!      |
//!      v
//!  flume::unbounded  ---> hook-0 ---> subject.scope(job)
//!                    ---> hook-1 ---> subject.scope(job)
//!                    ---> hook-N
//!
//! shutdown(): drop sender --> workers drain queue --> join
//! ```
//!
//! Jobs run with the submitting [`Subject`] bound to the worker thread, so
//! permission checks inside a job see the identity of the original caller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tracing::{debug, error, warn};

use crate::error::{HookError, ScmResult};
use crate::security::Subject;

#[cfg(test)]
mod tests;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of named OS threads fed by a channel.
pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<flume::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Start `size` threads named `<name>-<n>`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a thread cannot be spawned.
    pub fn new(name: impl Into<String>, size: usize) -> ScmResult<Self> {
        let name = name.into();
        let (sender, receiver) = flume::unbounded::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(size.max(1));
        for index in 0..size.max(1) {
            let receiver = receiver.clone();
            let pending = Arc::clone(&pending);
            let thread_name = format!("{name}-{index}");
            let handle = std::thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker_loop(&thread_name, &receiver, &pending))?;
            workers.push(handle);
        }
        debug!(pool = %name, workers = workers.len(), "worker pool started");

        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            pending,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Jobs submitted but not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Queue `job` to run on a worker with `subject` bound.
    ///
    /// # Errors
    ///
    /// Returns `HookError::PoolShutdown` after [`shutdown`](Self::shutdown).
    pub fn submit_as(
        &self,
        subject: Subject,
        job: impl FnOnce() + Send + 'static,
    ) -> ScmResult<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(self.shut_down_error());
        };
        self.pending.fetch_add(1, Ordering::AcqRel);
        let job: Job = Box::new(move || subject.scope(job));
        if sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(self.shut_down_error());
        }
        Ok(())
    }

    /// Stop accepting work, let queued jobs finish, and join the workers.
    ///
    /// Safe to call more than once and from a worker thread; a worker never
    /// joins itself.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let current = std::thread::current().id();
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!(pool = %self.name, "worker thread terminated abnormally");
            }
        }
        debug!(pool = %self.name, "worker pool stopped");
    }

    fn shut_down_error(&self) -> crate::error::ScmError {
        HookError::PoolShutdown {
            pool: self.name.clone(),
        }
        .into()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

fn worker_loop(thread_name: &str, receiver: &flume::Receiver<Job>, pending: &AtomicUsize) {
    while let Ok(job) = receiver.recv() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!(worker = %thread_name, "job panicked");
        }
        pending.fetch_sub(1, Ordering::AcqRel);
    }
}
