// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! In-memory control plane for vacate tests
//!
//! [`MockPlatform`] answers every [`PlatformApi`] call from data set up by
//! the test and records the calls it received. Plans are scripted per
//! resource: each `get_deployment` returns the next [`PlanInfo`] of the
//! script and the last one repeats.

// Allow unused code - not every test file uses every helper
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ece_platform_client::{ApiError, PlatformApi};
use ece_platform_types::{
    AllocatorHealthStatus, AllocatorInfo, BasicFailedReply, BasicFailedReplyElement, ClusterPlan,
    DeploymentGetResponse, DeploymentResource, MoveClusterDetails, MoveClustersCommandResponse,
    MoveClustersQuery, MoveClustersRequest, PlanAttempt, PlanInfo, PlanStepInfo,
    PlanStepLogMessage, ResourceInfo, ResourceKind, StepStatus,
};
use serde_json::json;

pub const ES_ID: &str = "3ee11eb40eda22cac0cce259625c6734";
pub const ES2_ID: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f90";
pub const KB_ID: &str = "6f0a2c7b5e3d4a1b9c8d7e6f5a4b3c2d";
pub const KB2_ID: &str = "9d8c7b6a5f4e3d2c1b0a99887766554f";

/// A call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetAllocator(String),
    DryRun {
        allocator_id: String,
        query: MoveClustersQuery,
    },
    Move {
        allocator_id: String,
        kind: ResourceKind,
        query: MoveClustersQuery,
        body: MoveClustersRequest,
    },
    FindDeployment(ResourceKind, String),
    GetDeployment(String),
}

#[derive(Default)]
pub struct MockPlatform {
    allocators: HashMap<String, AllocatorHealthStatus>,
    dry_runs: HashMap<String, MoveClustersCommandResponse>,
    broken_allocators: HashMap<String, (u16, String)>,
    rejected_moves: HashMap<String, (String, String)>,
    plans: Mutex<HashMap<String, VecDeque<PlanInfo>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a resource on an allocator with the plan polls it will go through
    pub fn with_resource(
        mut self,
        allocator_id: &str,
        kind: ResourceKind,
        resource_id: &str,
        plans: Vec<PlanInfo>,
    ) -> Self {
        self.dry_runs
            .entry(allocator_id.to_string())
            .or_default()
            .moves
            .clusters_mut(kind)
            .push(MoveClusterDetails {
                cluster_id: resource_id.to_string(),
                calculated_plan: Some(calculated_plan()),
                errors: None,
            });
        if !plans.is_empty() {
            self.plans
                .lock()
                .unwrap()
                .insert(resource_id.to_string(), plans.into());
        }
        self
    }

    /// Make the dry run of `allocator_id` report a failure for a resource
    pub fn with_dry_run_failure(
        mut self,
        allocator_id: &str,
        kind: ResourceKind,
        resource_id: &str,
        code: &str,
        message: &str,
    ) -> Self {
        self.dry_runs
            .entry(allocator_id.to_string())
            .or_default()
            .failures
            .clusters_mut(kind)
            .push(failure(resource_id, code, message));
        self
    }

    /// Make every move call for `allocator_id` fail with an HTTP error
    pub fn with_broken_allocator(mut self, allocator_id: &str, status: u16, message: &str) -> Self {
        self.broken_allocators
            .insert(allocator_id.to_string(), (status, message.to_string()));
        self
    }

    /// Make the typed move refuse a resource
    pub fn with_rejected_move(mut self, resource_id: &str, code: &str, message: &str) -> Self {
        self.rejected_moves.insert(
            resource_id.to_string(),
            (code.to_string(), message.to_string()),
        );
        self
    }

    pub fn with_allocator_status(mut self, allocator_id: &str, connected: bool, healthy: bool) -> Self {
        self.allocators.insert(
            allocator_id.to_string(),
            AllocatorHealthStatus {
                connected,
                healthy,
                maintenance_mode: true,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// The typed moves received, as (allocator, kind, body)
    pub fn moves(&self) -> Vec<(String, ResourceKind, MoveClustersQuery, MoveClustersRequest)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Move {
                    allocator_id,
                    kind,
                    query,
                    body,
                } => Some((allocator_id, kind, query, body)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn broken(&self, allocator_id: &str) -> Result<(), ApiError> {
        match self.broken_allocators.get(allocator_id) {
            Some((status, message)) => Err(ApiError::Status {
                status: *status,
                code: None,
                message: Some(message.clone()),
            }),
            None => Ok(()),
        }
    }
}

fn deployment_id_for(resource_id: &str) -> String {
    format!("dep-{}", &resource_id[..8])
}

fn failure(resource_id: &str, code: &str, message: &str) -> MoveClusterDetails {
    MoveClusterDetails {
        cluster_id: resource_id.to_string(),
        calculated_plan: None,
        errors: Some(BasicFailedReply {
            errors: vec![BasicFailedReplyElement {
                code: code.to_string(),
                message: message.to_string(),
                fields: None,
            }],
        }),
    }
}

/// The plan the mock control plane "calculates" for every resource
pub fn calculated_plan() -> ClusterPlan {
    serde_json::from_value(json!({
        "cluster_topology": [{"zone_count": 1, "size": {"value": 1024, "resource": "memory"}}],
        "transient": {"plan_configuration": {"move_only": true}}
    }))
    .unwrap()
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn get_allocator(&self, allocator_id: &str) -> Result<AllocatorInfo, ApiError> {
        self.record(Call::GetAllocator(allocator_id.to_string()));
        Ok(AllocatorInfo {
            allocator_id: allocator_id.to_string(),
            zone_id: None,
            host_ip: None,
            status: self
                .allocators
                .get(allocator_id)
                .cloned()
                .unwrap_or(AllocatorHealthStatus {
                    connected: true,
                    healthy: true,
                    maintenance_mode: false,
                }),
            instances: vec![],
        })
    }

    async fn move_clusters(
        &self,
        allocator_id: &str,
        query: MoveClustersQuery,
        _body: &MoveClustersRequest,
    ) -> Result<MoveClustersCommandResponse, ApiError> {
        self.record(Call::DryRun {
            allocator_id: allocator_id.to_string(),
            query,
        });
        self.broken(allocator_id)?;
        assert_eq!(query.validate_only, Some(true), "only dry runs are expected");
        Ok(self.dry_runs.get(allocator_id).cloned().unwrap_or_default())
    }

    async fn move_clusters_by_type(
        &self,
        allocator_id: &str,
        kind: ResourceKind,
        query: MoveClustersQuery,
        body: &MoveClustersRequest,
    ) -> Result<MoveClustersCommandResponse, ApiError> {
        self.record(Call::Move {
            allocator_id: allocator_id.to_string(),
            kind,
            query,
            body: body.clone(),
        });
        self.broken(allocator_id)?;

        let mut response = MoveClustersCommandResponse::default();
        for config in body.clusters(kind) {
            for id in &config.cluster_ids {
                match self.rejected_moves.get(id) {
                    Some((code, message)) => response
                        .failures
                        .clusters_mut(kind)
                        .push(failure(id, code, message)),
                    None => response.moves.clusters_mut(kind).push(MoveClusterDetails {
                        cluster_id: id.clone(),
                        calculated_plan: config.plan_override.clone(),
                        errors: None,
                    }),
                }
            }
        }
        Ok(response)
    }

    async fn find_deployment_id(
        &self,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<String, ApiError> {
        self.record(Call::FindDeployment(kind, resource_id.to_string()));
        if self.plans.lock().unwrap().contains_key(resource_id) {
            Ok(deployment_id_for(resource_id))
        } else {
            Err(ApiError::NotFound(format!(
                "deployment for {} resource {}",
                kind, resource_id
            )))
        }
    }

    async fn get_deployment(
        &self,
        deployment_id: &str,
    ) -> Result<DeploymentGetResponse, ApiError> {
        self.record(Call::GetDeployment(deployment_id.to_string()));

        let mut plans = self.plans.lock().unwrap();
        let (resource_id, script) = plans
            .iter_mut()
            .find(|(id, _)| deployment_id_for(id) == deployment_id)
            .ok_or_else(|| ApiError::NotFound(format!("deployment {}", deployment_id)))?;

        let plan_info = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };

        let mut deployment = DeploymentGetResponse {
            id: deployment_id.to_string(),
            ..Default::default()
        };
        // The kind does not matter to the mock, list the resource under all
        for kind in [
            ResourceKind::Elasticsearch,
            ResourceKind::Kibana,
            ResourceKind::Apm,
            ResourceKind::Appsearch,
        ] {
            deployment.resources.resources_mut(kind).push(DeploymentResource {
                id: resource_id.clone(),
                ref_id: None,
                info: ResourceInfo {
                    plan_info: plan_info.clone(),
                },
            });
        }
        Ok(deployment)
    }
}

// ============================================================================
// Plan scripts
// ============================================================================

fn at(minute: u32, second: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, second).unwrap()
}

pub fn step(id: &str, status: StepStatus) -> PlanStepInfo {
    PlanStepInfo {
        step_id: id.to_string(),
        status,
        started: at(0, 0),
        completed: None,
        duration_in_millis: None,
        info_log: vec![],
    }
}

fn attempt(steps: &[(&str, StepStatus)]) -> PlanAttempt {
    PlanAttempt {
        plan_attempt_id: Some("attempt-0".into()),
        attempt_start_time: Some(at(0, 0)),
        plan_attempt_log: steps.iter().map(|(id, s)| step(id, *s)).collect(),
        ..Default::default()
    }
}

/// A plan still running
pub fn pending(steps: &[(&str, StepStatus)]) -> PlanInfo {
    PlanInfo {
        current: None,
        pending: Some(attempt(steps)),
    }
}

/// A plan that finished with every step successful
pub fn finished(steps: &[&str]) -> PlanInfo {
    let steps: Vec<(&str, StepStatus)> = steps.iter().map(|s| (*s, StepStatus::Success)).collect();
    let mut attempt = attempt(&steps);
    attempt.attempt_end_time = Some(at(1, 30));
    attempt.healthy = Some(true);
    PlanInfo {
        current: Some(attempt),
        pending: None,
    }
}

/// A running plan whose last step failed with `message`
pub fn failing(steps: &[&str], failed: &str, message: &str) -> PlanInfo {
    let mut attempt = attempt(
        &steps
            .iter()
            .map(|s| (*s, StepStatus::Success))
            .collect::<Vec<_>>(),
    );
    let mut failed_step = step(failed, StepStatus::Error);
    failed_step.info_log = vec![
        PlanStepLogMessage {
            message: "Starting step".into(),
            stage: Some("starting".into()),
            timestamp: None,
        },
        PlanStepLogMessage {
            message: message.to_string(),
            stage: Some("error".into()),
            timestamp: None,
        },
    ];
    attempt.plan_attempt_log.push(failed_step);
    PlanInfo {
        current: None,
        pending: Some(attempt),
    }
}

/// The usual three step plan: two polls while running, then done
pub fn three_step_plan() -> Vec<PlanInfo> {
    use StepStatus::{Pending, Success};
    vec![
        pending(&[("step1", Success), ("step2", Pending)]),
        pending(&[("step1", Success), ("step2", Success), ("step3", Pending)]),
        finished(&["step1", "step2", "step3"]),
    ]
}
