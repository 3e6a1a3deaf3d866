// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Bounded worker pool
//!
//! `size` workers take items from a queue holding at most `size` items.
//! [`Pool::add`] never blocks: items that do not fit are handed back as
//! leftovers for the caller to offer again later.
//!
//! Status moves `idle -> running -> stopping -> stopped` and never back. The
//! first interrupt moves a running pool to `stopping`: queued items are no
//! longer started, in-flight items run to completion. A second interrupt,
//! or a [`Pool::stop`] that times out, cancels the in-flight items through
//! the [`Cancellation`] handed to the run function.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::BoxFuture;
use strum::Display;
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::cancel::{Cancellation, InterruptSource};
use crate::error::PoolError;
use crate::output::{OutputSink, emit};

/// Lifecycle of a [`Pool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PoolStatus {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub status: PoolStatus,
    /// Items accepted but not yet started
    pub queued: usize,
    /// Items being processed
    pub running: usize,
}

type RunFn<T, E> = Arc<dyn Fn(T, Cancellation) -> BoxFuture<'static, Result<(), E>> + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Shared<T, E> {
    sink: Arc<dyn OutputSink>,
    state: watch::Sender<PoolState>,
    sender: Mutex<Option<mpsc::Sender<T>>>,
    /// Set once the pool stops accepting and starting work
    stopping: Cancellation,
    /// Set to cancel in-flight work
    abort: Cancellation,
    interrupts: AtomicU64,
    errors: Mutex<Vec<E>>,
}

impl<T, E> Shared<T, E> {
    fn begin_stop(&self) {
        self.state.send_if_modified(|s| {
            if s.status < PoolStatus::Stopping {
                s.status = PoolStatus::Stopping;
                true
            } else {
                false
            }
        });
        self.stopping.cancel();
        lock(&self.sender).take();
    }

    fn on_interrupt(&self) {
        let count = self.interrupts.fetch_add(1, Ordering::SeqCst) + 1;
        if count == 1 {
            tracing::warn!("received interrupt, stopping pool");
            emit(self.sink.as_ref(), "pool: received interrupt, stopping pool...");
            self.begin_stop();
        } else {
            tracing::warn!("received second interrupt, cancelling in-flight work");
            emit(
                self.sink.as_ref(),
                "pool: received second interrupt, cancelling in-flight work...",
            );
            self.begin_stop();
            self.abort.cancel();
        }
    }
}

/// A fixed-size pool running `run` on every added item
pub struct Pool<T, E> {
    size: usize,
    stop_timeout: Duration,
    run: RunFn<T, E>,
    shared: Arc<Shared<T, E>>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<T>>>,
    workers: Mutex<JoinSet<()>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    interrupts: InterruptSource,
    leftovers: Mutex<Vec<T>>,
}

impl<T, E> Pool<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut>(
        size: usize,
        run: F,
        stop_timeout: Duration,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self, PoolError>
    where
        F: Fn(T, Cancellation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }

        let (sender, receiver) = mpsc::channel(size);
        let (state, _) = watch::channel(PoolState {
            status: PoolStatus::Idle,
            queued: 0,
            running: 0,
        });

        Ok(Self {
            size,
            stop_timeout,
            run: Arc::new(move |item, cancel| Box::pin(run(item, cancel))),
            shared: Arc::new(Shared {
                sink,
                state,
                sender: Mutex::new(Some(sender)),
                stopping: Cancellation::new(),
                abort: Cancellation::new(),
                interrupts: AtomicU64::new(0),
                errors: Mutex::new(Vec::new()),
            }),
            receiver: Arc::new(AsyncMutex::new(receiver)),
            workers: Mutex::new(JoinSet::new()),
            listener: Mutex::new(None),
            interrupts: InterruptSource::default(),
            leftovers: Mutex::new(Vec::new()),
        })
    }

    /// Replace the process interrupt signal with another source
    pub fn with_interrupts(mut self, source: InterruptSource) -> Self {
        self.interrupts = source;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn state(&self) -> PoolState {
        *self.shared.state.borrow()
    }

    pub fn status(&self) -> PoolStatus {
        self.state().status
    }

    /// Queue items without blocking. Returns the items that did not fit, or
    /// all of them once the pool is stopping.
    pub fn add(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let sender = lock(&self.shared.sender);
        let Some(sender) = sender.as_ref() else {
            return items.into_iter().collect();
        };

        let mut leftovers = Vec::new();
        for item in items {
            // Count first so a worker never sees queued underflow
            self.shared.state.send_modify(|s| s.queued += 1);
            if let Err(err) = sender.try_send(item) {
                self.shared.state.send_modify(|s| s.queued -= 1);
                leftovers.push(err.into_inner());
            }
        }
        leftovers
    }

    /// Resolves once the queue has room or the pool is stopping
    pub async fn wait_for_capacity(&self) {
        let size = self.size;
        let mut rx = self.shared.state.subscribe();
        let _ = rx
            .wait_for(|s| s.queued < size || s.status >= PoolStatus::Stopping)
            .await;
    }

    /// Spawn the workers and begin listening for interrupts
    pub fn start(&self) -> Result<(), PoolError> {
        let status = self.status();
        if status != PoolStatus::Idle {
            return Err(PoolError::NotIdle(status));
        }
        self.shared
            .state
            .send_modify(|s| s.status = PoolStatus::Running);

        let mut workers = lock(&self.workers);
        for id in 0..self.size {
            workers.spawn(worker(
                id,
                self.receiver.clone(),
                self.shared.clone(),
                self.run.clone(),
            ));
        }
        *lock(&self.listener) = Some(tokio::spawn(listen(
            self.interrupts.clone(),
            self.shared.clone(),
        )));

        tracing::debug!(size = self.size, "pool started");
        Ok(())
    }

    /// Resolves once no item is running and either the queue is empty or
    /// the pool is stopping. The pool must have been started.
    pub async fn wait(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx
            .wait_for(|s| {
                s.running == 0 && (s.queued == 0 || s.status >= PoolStatus::Stopping)
            })
            .await;
    }

    /// Interrupt the pool as if the process received Ctrl-C
    pub fn interrupt(&self) {
        self.shared.on_interrupt();
    }

    /// Stop accepting work, wait for the workers and collect unstarted
    /// items as leftovers. Workers still busy after the stop timeout have
    /// their work cancelled and are abandoned.
    pub async fn stop(&self) -> Result<(), PoolError> {
        self.shared.begin_stop();

        let mut workers = std::mem::take(&mut *lock(&self.workers));
        let joined = tokio::time::timeout(self.stop_timeout, async {
            while let Some(result) = workers.join_next().await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "pool worker failed");
                }
            }
        })
        .await;

        let result = if joined.is_err() {
            tracing::warn!(timeout = ?self.stop_timeout, "pool workers did not stop in time");
            self.shared.abort.cancel();
            workers.abort_all();
            Err(PoolError::StopTimedOut(self.stop_timeout))
        } else {
            Ok(())
        };

        {
            let mut receiver = self.receiver.lock().await;
            receiver.close();
            let mut leftovers = lock(&self.leftovers);
            while let Ok(item) = receiver.try_recv() {
                leftovers.push(item);
            }
        }

        self.shared.state.send_modify(|s| {
            s.queued = 0;
            s.status = PoolStatus::Stopped;
        });

        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
        }

        tracing::debug!("pool stopped");
        result
    }

    /// Take the items that were queued but never started
    pub fn leftovers(&self) -> Vec<T> {
        std::mem::take(&mut *lock(&self.leftovers))
    }

    /// Take the errors returned by the run function so far
    pub fn take_errors(&self) -> Vec<E> {
        std::mem::take(&mut *lock(&self.shared.errors))
    }
}

async fn worker<T, E>(
    id: usize,
    receiver: Arc<AsyncMutex<mpsc::Receiver<T>>>,
    shared: Arc<Shared<T, E>>,
    run: RunFn<T, E>,
) {
    loop {
        if shared.stopping.is_cancelled() {
            break;
        }

        let next = tokio::select! {
            biased;
            _ = shared.stopping.cancelled() => None,
            item = async { receiver.lock().await.recv().await } => item,
        };
        let Some(item) = next else {
            break;
        };

        shared.state.send_modify(|s| {
            s.queued = s.queued.saturating_sub(1);
            s.running += 1;
        });

        let result = run(item, shared.abort.clone()).await;
        if let Err(e) = result {
            lock(&shared.errors).push(e);
        }

        shared.state.send_modify(|s| s.running -= 1);
    }
    tracing::trace!(worker = id, "pool worker exiting");
}

async fn listen<T, E>(source: InterruptSource, shared: Arc<Shared<T, E>>) {
    match source {
        InterruptSource::CtrlC => loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "cannot listen for interrupts");
                return;
            }
            shared.on_interrupt();
        },
        InterruptSource::Manual(interrupter) => {
            let mut rx = interrupter.subscribe();
            let mut delivered = *rx.borrow_and_update();
            while rx.changed().await.is_ok() {
                let total = *rx.borrow_and_update();
                for _ in delivered..total {
                    shared.on_interrupt();
                }
                delivered = total;
            }
        }
    }
}
