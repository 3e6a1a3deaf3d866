// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Plan tracking
//!
//! A [`PlanTracker`] polls the deployment that owns a resource and turns its
//! plan attempt log into a sequence of [`PlanEvent`]s:
//!
//! - every step is reported once when first seen, and once more when it
//!   leaves `pending`
//! - the sequence ends with exactly one terminal event
//! - "not found" answers and missing plans each consume one retry; once more
//!   than `max_retries` have been consumed the tracker gives up
//!
//! The first poll happens immediately, later ones after `poll_frequency`.
//! Cancellation is observed while waiting and while a poll is in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ece_platform_client::{ApiError, PlatformApi};
use ece_platform_types::{PlanAttempt, PlanInfo, ResourceKind, StepStatus};

use crate::cancel::Cancellation;
use crate::params::DEFAULT_TRACK_FREQUENCY;

/// What to track and how often
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub resource_id: String,
    pub kind: ResourceKind,
    pub poll_frequency: Duration,
    pub max_retries: u32,
}

/// A plan step as it was observed
#[derive(Debug, Clone, PartialEq)]
pub struct StepEvent {
    pub step_id: String,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    /// Error messages, only set for failed steps
    pub messages: Vec<String>,
    /// Time since the plan attempt started
    pub plan_duration: Duration,
}

#[derive(Debug)]
pub enum PlanEvent {
    Step(StepEvent),
    /// The plan's final step succeeded
    Completed { total_duration: Duration },
    /// A step failed
    Failed {
        step_id: String,
        message: String,
        total_duration: Duration,
    },
    /// More than `max_retries` polls found no plan
    GaveUp { retries: u32 },
    /// The control plane could not be queried
    Error(ApiError),
    Cancelled,
}

impl PlanEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PlanEvent::Step(_))
    }
}

/// Pull-based plan tracker. Call [`PlanTracker::next_event`] until it
/// returns `None`.
pub struct PlanTracker {
    api: Arc<dyn PlatformApi>,
    config: TrackerConfig,
    cancel: Cancellation,
    deployment_id: Option<String>,
    retries: u32,
    seen: HashMap<String, StepStatus>,
    seen_pending: bool,
    queue: VecDeque<PlanEvent>,
    polled: bool,
    stopped: bool,
}

impl PlanTracker {
    /// A zero `poll_frequency` is replaced with [`DEFAULT_TRACK_FREQUENCY`].
    pub fn new(api: Arc<dyn PlatformApi>, mut config: TrackerConfig, cancel: Cancellation) -> Self {
        if config.poll_frequency.is_zero() {
            config.poll_frequency = DEFAULT_TRACK_FREQUENCY;
        }
        Self {
            api,
            config,
            cancel,
            deployment_id: None,
            retries: 0,
            seen: HashMap::new(),
            seen_pending: false,
            queue: VecDeque::new(),
            polled: false,
            stopped: false,
        }
    }

    /// The deployment owning the resource, once it has been resolved
    pub fn deployment_id(&self) -> Option<&str> {
        self.deployment_id.as_deref()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The next event, or `None` after the terminal event was returned
    pub async fn next_event(&mut self) -> Option<PlanEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            if self.stopped {
                return None;
            }

            if self.polled {
                let cancel = self.cancel.clone();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        self.finish(PlanEvent::Cancelled);
                        continue;
                    }
                    _ = tokio::time::sleep(self.config.poll_frequency) => {}
                }
            }
            self.polled = true;

            if self.cancel.is_cancelled() {
                self.finish(PlanEvent::Cancelled);
                continue;
            }
            self.poll().await;
        }
    }

    async fn poll(&mut self) {
        let cancel = self.cancel.clone();
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            fetched = self.fetch_plan_info() => Some(fetched),
        };
        let Some(fetched) = fetched else {
            self.finish(PlanEvent::Cancelled);
            return;
        };

        match fetched {
            Ok(Some(plan_info)) => self.observe(plan_info),
            Ok(None) => self.record_miss("no plan information"),
            Err(e) if e.is_not_found() => self.record_miss(&e.to_string()),
            Err(e) => {
                tracing::warn!(
                    resource_id = %self.config.resource_id,
                    error = %e,
                    "plan tracking failed"
                );
                self.finish(PlanEvent::Error(e));
            }
        }
    }

    async fn fetch_plan_info(&mut self) -> Result<Option<PlanInfo>, ApiError> {
        let deployment_id = match &self.deployment_id {
            Some(id) => id.clone(),
            None => {
                let id = self
                    .api
                    .find_deployment_id(self.config.kind, &self.config.resource_id)
                    .await?;
                tracing::debug!(
                    resource_id = %self.config.resource_id,
                    deployment_id = %id,
                    "resolved deployment"
                );
                self.deployment_id = Some(id.clone());
                id
            }
        };

        let deployment = self.api.get_deployment(&deployment_id).await?;
        Ok(deployment
            .resources
            .find(self.config.kind, &self.config.resource_id)
            .and_then(|r| r.info.plan_info.clone()))
    }

    fn record_miss(&mut self, reason: &str) {
        self.retries += 1;
        tracing::debug!(
            resource_id = %self.config.resource_id,
            retries = self.retries,
            max_retries = self.config.max_retries,
            reason,
            "no plan to track yet"
        );
        if self.retries > self.config.max_retries {
            self.finish(PlanEvent::GaveUp {
                retries: self.config.max_retries,
            });
        }
    }

    fn observe(&mut self, plan_info: PlanInfo) {
        match (plan_info.pending, plan_info.current) {
            (Some(pending), _) => {
                self.seen_pending = true;
                self.emit_new_steps(&pending);
                self.finish_if_failed(&pending);
            }
            (None, Some(current)) => {
                // Steps of the attempt we followed that finished between polls
                if self.seen_pending {
                    self.emit_new_steps(&current);
                }
                if self.finish_if_failed(&current) {
                    return;
                }
                match current.last_step() {
                    Some(step) if step.status == StepStatus::Success => {
                        let total_duration = total_duration(&current);
                        self.finish(PlanEvent::Completed { total_duration });
                    }
                    _ => self.record_miss("current plan has not finished"),
                }
            }
            (None, None) => self.record_miss("resource has no plan"),
        }
    }

    fn emit_new_steps(&mut self, attempt: &PlanAttempt) {
        let plan_duration = elapsed_since(attempt.started_at());

        for step in &attempt.plan_attempt_log {
            let emit = match self.seen.get(&step.step_id) {
                None => true,
                Some(StepStatus::Pending) => step.status != StepStatus::Pending,
                Some(_) => false,
            };
            if !emit {
                continue;
            }

            self.seen.insert(step.step_id.clone(), step.status);
            let messages = if step.status == StepStatus::Error {
                step.error_messages().into_iter().map(String::from).collect()
            } else {
                Vec::new()
            };
            self.queue.push_back(PlanEvent::Step(StepEvent {
                step_id: step.step_id.clone(),
                status: step.status,
                started_at: step.started,
                messages,
                plan_duration,
            }));
        }
    }

    fn finish_if_failed(&mut self, attempt: &PlanAttempt) -> bool {
        let Some(step) = attempt.failed_step() else {
            return false;
        };
        let messages = step.error_messages();
        let message = if messages.is_empty() {
            format!("step {} failed", step.step_id)
        } else {
            messages.join("; ")
        };
        let event = PlanEvent::Failed {
            step_id: step.step_id.clone(),
            message,
            total_duration: total_duration(attempt),
        };
        self.finish(event);
        true
    }

    fn finish(&mut self, event: PlanEvent) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.queue.push_back(event);
    }
}

fn elapsed_since(start: Option<DateTime<Utc>>) -> Duration {
    start
        .and_then(|s| (Utc::now() - s).to_std().ok())
        .unwrap_or_default()
}

fn total_duration(attempt: &PlanAttempt) -> Duration {
    match (attempt.started_at(), attempt.attempt_end_time) {
        (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
        (start, _) => elapsed_since(start),
    }
}
