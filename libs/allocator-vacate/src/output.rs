// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Progress output
//!
//! Workers share one [`OutputSink`]. A line is written with a single
//! `write_line` call, so lines from concurrent workers never interleave.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ece_platform_types::{ResourceKind, StepStatus};
use tokio::sync::watch;

use crate::tracker::StepEvent;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Destination for human readable progress lines
pub trait OutputSink: Send + Sync {
    /// Write one line. The sink appends the newline.
    fn write_line(&self, line: &str) -> io::Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sink writing to any [`Write`] implementation
pub struct WriterSink<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut inner = lock(&self.inner);
        writeln!(inner, "{}", line)?;
        inner.flush()
    }
}

/// Sink writing to the process standard output
pub fn stdout_sink() -> Arc<dyn OutputSink> {
    Arc::new(WriterSink::new(io::stdout()))
}

/// Sink collecting lines in memory
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    count: watch::Sender<usize>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    pub fn new() -> Self {
        let (count, _rx) = watch::channel(0);
        Self {
            lines: Mutex::new(Vec::new()),
            count,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.lines).iter().any(|l| l.contains(needle))
    }

    /// Resolves once at least `n` lines have been written
    pub async fn wait_for_lines(&self, n: usize) {
        let mut rx = self.count.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }
}

impl OutputSink for MemorySink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let written = {
            let mut lines = lock(&self.lines);
            lines.push(line.to_string());
            lines.len()
        };
        self.count.send_replace(written);
        Ok(())
    }
}

/// Write a line, logging instead of failing when the sink is broken
pub(crate) fn emit(sink: &dyn OutputSink, line: &str) {
    if let Err(e) = sink.write_line(line) {
        tracing::warn!(error = %e, "failed to write progress line");
    }
}

/// Format a duration as `1h2m3s`, `4m0s`, `7s` or `0s`
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Identifies the resource whose plan a line describes
#[derive(Debug, Clone)]
pub struct LinePrefix<'a> {
    pub deployment_id: &'a str,
    pub kind: ResourceKind,
    pub resource_id: &'a str,
}

impl std::fmt::Display for LinePrefix<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Deployment [{}] - [{}][{}]",
            self.deployment_id,
            self.kind.title(),
            self.resource_id
        )
    }
}

pub(crate) fn step_line(prefix: &LinePrefix<'_>, step: &StepEvent) -> String {
    let duration = format_duration(step.plan_duration);
    match step.status {
        StepStatus::Error => format!(
            "{}: running step \"{}\" caught error: \"{}\" (Plan duration {})...",
            prefix,
            step.step_id,
            step.messages.join("; "),
            duration
        ),
        StepStatus::Pending | StepStatus::Success => format!(
            "{}: running step \"{}\" (Plan duration {})...",
            prefix, step.step_id, duration
        ),
    }
}

pub(crate) fn completed_line(prefix: &LinePrefix<'_>, total: Duration) -> String {
    format!(
        "{}{}: finished running all the plan steps (Total plan duration {}){}",
        GREEN,
        prefix,
        format_duration(total),
        RESET
    )
}

pub(crate) fn failed_line(prefix: &LinePrefix<'_>, message: &str, total: Duration) -> String {
    format!(
        "{}{}: caught error: \"{}\" (Total plan duration {}){}",
        RED,
        prefix,
        message,
        format_duration(total),
        RESET
    )
}
