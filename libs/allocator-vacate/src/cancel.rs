// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cancellation flags and interrupt sources

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// A one-way cancellation flag that can be checked synchronously or awaited.
///
/// Clones share the same flag.
#[derive(Clone, Debug)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            tx: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            self.tx.send_replace(true);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`Cancellation::cancel`] has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as self, so this only returns once set
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Programmatic interrupt trigger, equivalent to the user pressing Ctrl-C.
#[derive(Clone, Debug)]
pub struct Interrupter {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for Interrupter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn interrupt(&self) {
        self.tx.send_modify(|count| *count += 1);
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// Where the worker pool receives interrupts from
#[derive(Clone, Debug, Default)]
pub enum InterruptSource {
    /// The process interrupt signal (Ctrl-C)
    #[default]
    CtrlC,
    /// Only interrupts raised through the given handle
    Manual(Interrupter),
}
