// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Deployment and plan tracking models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::ResourceKind;

/// Response of `POST /deployments/_search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentsSearchResponse {
    #[serde(default)]
    pub deployments: Vec<DeploymentSearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSearchHit {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response of `GET /deployments/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentGetResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub resources: DeploymentResources,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResources {
    #[serde(default)]
    pub elasticsearch: Vec<DeploymentResource>,
    #[serde(default)]
    pub kibana: Vec<DeploymentResource>,
    #[serde(default)]
    pub apm: Vec<DeploymentResource>,
    #[serde(default)]
    pub appsearch: Vec<DeploymentResource>,
}

impl DeploymentResources {
    pub fn resources(&self, kind: ResourceKind) -> &[DeploymentResource] {
        match kind {
            ResourceKind::Elasticsearch => &self.elasticsearch,
            ResourceKind::Kibana => &self.kibana,
            ResourceKind::Apm => &self.apm,
            ResourceKind::Appsearch => &self.appsearch,
        }
    }

    pub fn resources_mut(&mut self, kind: ResourceKind) -> &mut Vec<DeploymentResource> {
        match kind {
            ResourceKind::Elasticsearch => &mut self.elasticsearch,
            ResourceKind::Kibana => &mut self.kibana,
            ResourceKind::Apm => &mut self.apm,
            ResourceKind::Appsearch => &mut self.appsearch,
        }
    }

    /// Look a resource up by kind and id
    pub fn find(&self, kind: ResourceKind, resource_id: &str) -> Option<&DeploymentResource> {
        self.resources(kind).iter().find(|r| r.id == resource_id)
    }
}

/// One resource inside a deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub info: ResourceInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_info: Option<PlanInfo>,
}

/// The current (last finished) and pending (in progress) plan attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<PlanAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PlanAttempt>,
}

/// A single attempt at running a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanAttempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_attempt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,
    /// Steps in the order the plan engine ran them
    #[serde(default)]
    pub plan_attempt_log: Vec<PlanStepInfo>,
}

impl PlanAttempt {
    /// When the attempt started: the attempt start time, or the start of its
    /// first step when the former is missing.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.attempt_start_time
            .or_else(|| self.plan_attempt_log.first().map(|s| s.started))
    }

    pub fn last_step(&self) -> Option<&PlanStepInfo> {
        self.plan_attempt_log.last()
    }

    /// The first step that ended in error
    pub fn failed_step(&self) -> Option<&PlanStepInfo> {
        self.plan_attempt_log
            .iter()
            .find(|s| s.status == StepStatus::Error)
    }
}

/// Status of a plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Success,
    Error,
}

/// A step in a plan attempt log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStepInfo {
    pub step_id: String,
    pub status: StepStatus,
    pub started: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_millis: Option<i64>,
    #[serde(default)]
    pub info_log: Vec<PlanStepLogMessage>,
}

impl PlanStepInfo {
    /// Messages describing why the step failed.
    ///
    /// Entries logged in the `error` stage are preferred; when none are
    /// tagged that way every message of the step is returned.
    pub fn error_messages(&self) -> Vec<&str> {
        let tagged: Vec<&str> = self
            .info_log
            .iter()
            .filter(|m| m.stage.as_deref() == Some("error"))
            .map(|m| m.message.as_str())
            .collect();
        if !tagged.is_empty() {
            return tagged;
        }
        self.info_log.iter().map(|m| m.message.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStepLogMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}
