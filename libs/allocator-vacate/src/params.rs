// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Vacate requests and their validation

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ece_platform_types::ResourceKind;

use crate::cancel::InterruptSource;
use crate::error::{AggregateError, ResourceRef, VacateError};
use crate::output::OutputSink;

/// Length of a resource id
pub const RESOURCE_ID_LEN: usize = 32;

/// Default number of "no plan found" polls tolerated per resource
pub const DEFAULT_MAX_POLL_RETRIES: u32 = 4;

/// Default interval between plan polls
pub const DEFAULT_TRACK_FREQUENCY: Duration = Duration::from_secs(1);

/// Default time [`crate::Pool::stop`] waits for workers
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(60);

/// Plan flags forced onto every moved resource. They only apply to
/// Elasticsearch plans; other kinds ignore them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOverrides {
    pub skip_snapshot: Option<bool>,
    pub skip_data_migration: Option<bool>,
    pub override_failsafe: Option<bool>,
}

impl PlanOverrides {
    pub fn is_empty(&self) -> bool {
        self.skip_snapshot.is_none()
            && self.skip_data_migration.is_none()
            && self.override_failsafe.is_none()
    }
}

/// Plan tracking knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSettings {
    pub max_poll_retries: u32,
    pub poll_frequency: Duration,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            max_poll_retries: DEFAULT_MAX_POLL_RETRIES,
            poll_frequency: DEFAULT_TRACK_FREQUENCY,
        }
    }
}

impl TrackSettings {
    /// Replace zero values with the defaults
    pub fn or_defaults(self) -> Self {
        Self {
            max_poll_retries: if self.max_poll_retries == 0 {
                DEFAULT_MAX_POLL_RETRIES
            } else {
                self.max_poll_retries
            },
            poll_frequency: if self.poll_frequency.is_zero() {
                DEFAULT_TRACK_FREQUENCY
            } else {
                self.poll_frequency
            },
        }
    }
}

/// Request to vacate one or more allocators
#[derive(Clone)]
pub struct VacateRequest {
    /// Allocators to vacate, processed in order
    pub allocators: Vec<String>,
    /// Allocators the control plane should prefer as targets
    pub preferred_allocators: Vec<String>,
    /// When non-empty, only these resources are moved
    pub cluster_filter: Vec<String>,
    /// When set, only resources of this kind are moved
    pub kind_filter: Option<ResourceKind>,
    /// Number of resources vacated at the same time
    pub concurrency: usize,
    pub tracking: TrackSettings,
    /// Force the allocator health flag sent to the control plane. Only
    /// valid with a single allocator.
    pub allocator_down: Option<bool>,
    /// Move instances without changing the resource topology
    pub move_only: bool,
    /// Return as soon as the moves are accepted
    pub skip_tracking: bool,
    pub plan_overrides: PlanOverrides,
    pub output: Arc<dyn OutputSink>,
    pub stop_timeout: Duration,
    pub interrupts: InterruptSource,
}

impl fmt::Debug for VacateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VacateRequest")
            .field("allocators", &self.allocators)
            .field("preferred_allocators", &self.preferred_allocators)
            .field("cluster_filter", &self.cluster_filter)
            .field("kind_filter", &self.kind_filter)
            .field("concurrency", &self.concurrency)
            .field("tracking", &self.tracking)
            .field("allocator_down", &self.allocator_down)
            .field("move_only", &self.move_only)
            .field("skip_tracking", &self.skip_tracking)
            .field("plan_overrides", &self.plan_overrides)
            .field("stop_timeout", &self.stop_timeout)
            .finish_non_exhaustive()
    }
}

impl VacateRequest {
    /// A request with default knobs
    pub fn new(allocators: Vec<String>, output: Arc<dyn OutputSink>) -> Self {
        Self {
            allocators,
            preferred_allocators: Vec::new(),
            cluster_filter: Vec::new(),
            kind_filter: None,
            concurrency: 1,
            tracking: TrackSettings::default(),
            allocator_down: None,
            move_only: false,
            skip_tracking: false,
            plan_overrides: PlanOverrides::default(),
            output,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            interrupts: InterruptSource::default(),
        }
    }

    /// Check the request before any remote call is made. Every problem is
    /// reported, not just the first.
    pub fn validate(&self) -> Result<(), AggregateError> {
        let mut merr = AggregateError::new();
        let mut invalid = |msg: String| merr.push(VacateError::Validation(msg));

        if self.allocators.is_empty() {
            invalid("allocator vacate: requires at least one allocator id".into());
        }
        if self.allocators.iter().any(|a| a.trim().is_empty()) {
            invalid("allocator vacate: allocator ids cannot be empty".into());
        }
        if !self.cluster_filter.is_empty() && self.kind_filter.is_some() {
            invalid(
                "allocator vacate: resource id filter and kind filter are mutually exclusive"
                    .into(),
            );
        }
        for id in &self.cluster_filter {
            if id.len() != RESOURCE_ID_LEN {
                invalid(format!(
                    "allocator vacate: invalid resource id {:?}, expected {} characters",
                    id, RESOURCE_ID_LEN
                ));
            }
        }
        if self.concurrency == 0 {
            invalid("allocator vacate: concurrency must be at least 1".into());
        }
        if self.allocator_down.is_some() && self.allocators.len() != 1 {
            invalid(
                "allocator vacate: allocator down can only be set when vacating a single allocator"
                    .into(),
            );
        }

        merr.into_result(())
    }
}

/// Everything needed to vacate a single resource
#[derive(Clone)]
pub struct VacateWorkItem {
    pub allocator_id: String,
    pub resource_id: String,
    pub kind: ResourceKind,
    pub preferred_allocators: Vec<String>,
    /// `None` asks the control plane for the allocator health
    pub allocator_down: Option<bool>,
    pub move_only: bool,
    pub plan_overrides: PlanOverrides,
    pub tracking: TrackSettings,
    pub skip_tracking: bool,
    pub output: Arc<dyn OutputSink>,
}

impl fmt::Debug for VacateWorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VacateWorkItem")
            .field("allocator_id", &self.allocator_id)
            .field("resource_id", &self.resource_id)
            .field("kind", &self.kind)
            .field("allocator_down", &self.allocator_down)
            .field("skip_tracking", &self.skip_tracking)
            .finish_non_exhaustive()
    }
}

impl VacateWorkItem {
    /// The work item for one resource of a vacate request
    pub fn from_request(
        request: &VacateRequest,
        allocator_id: &str,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Self {
        Self {
            allocator_id: allocator_id.to_string(),
            resource_id: resource_id.to_string(),
            kind,
            preferred_allocators: request.preferred_allocators.clone(),
            allocator_down: request.allocator_down,
            move_only: request.move_only,
            plan_overrides: request.plan_overrides,
            tracking: request.tracking,
            skip_tracking: request.skip_tracking,
            output: request.output.clone(),
        }
    }

    pub fn resource(&self) -> ResourceRef {
        ResourceRef {
            allocator_id: self.allocator_id.clone(),
            resource_id: self.resource_id.clone(),
            kind: self.kind,
        }
    }

    pub fn validate(&self) -> Result<(), VacateError> {
        let mut problems = Vec::new();
        if self.allocator_id.trim().is_empty() {
            problems.push("allocator id cannot be empty".to_string());
        }
        if self.resource_id.len() != RESOURCE_ID_LEN {
            problems.push(format!(
                "invalid resource id {:?}, expected {} characters",
                self.resource_id, RESOURCE_ID_LEN
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(VacateError::Validation(format!(
                "resource vacate: {}",
                problems.join("; ")
            )))
        }
    }
}
