// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Move clusters request and response documents
//!
//! The same per-kind list shape is used three times: the `moves` and
//! `failures` halves of a [`MoveClustersCommandResponse`], and the body of a
//! [`MoveClustersRequest`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

use crate::ResourceKind;

// ============================================================================
// Query parameters
// ============================================================================

/// Query flags accepted by both move endpoints. Unset flags are omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveClustersQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocator_down: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_only: Option<bool>,
}

// ============================================================================
// Plans
// ============================================================================

/// A resource plan as calculated by the control plane.
///
/// Only `transient.plan_configuration` is typed; all other fields live in
/// `other` and are written back exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient: Option<TransientPlan>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The transient (one-shot) part of a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransientPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_configuration: Option<PlanConfiguration>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Plan control settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanConfiguration {
    /// Allocators the control plane should prefer as move targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_allocators: Option<Vec<String>>,

    /// Skip the snapshot taken before the plan runs (Elasticsearch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_snapshot: Option<bool>,

    /// Skip migrating shard data off the old instances (Elasticsearch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_data_migration: Option<bool>,

    /// Ignore the failsafe checks (Elasticsearch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_failsafe: Option<bool>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ClusterPlan {
    /// Mutable access to the plan configuration, creating the intermediate
    /// objects when the remote did not send them.
    pub fn plan_configuration_mut(&mut self) -> &mut PlanConfiguration {
        self.transient
            .get_or_insert_with(TransientPlan::default)
            .plan_configuration
            .get_or_insert_with(PlanConfiguration::default)
    }

    /// The plan configuration, if present
    pub fn plan_configuration(&self) -> Option<&PlanConfiguration> {
        self.transient
            .as_ref()
            .and_then(|t| t.plan_configuration.as_ref())
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Structured error body used throughout the control plane API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicFailedReply {
    #[serde(default)]
    pub errors: Vec<BasicFailedReplyElement>,
}

/// A single structured error
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicFailedReplyElement {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

// ============================================================================
// Move clusters response
// ============================================================================

/// One resource entry in a move response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveClusterDetails {
    pub cluster_id: String,

    /// The plan the control plane would run to move this resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_plan: Option<ClusterPlan>,

    /// Why the move failed (only set on `failures` entries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BasicFailedReply>,
}

/// Per-kind lists of resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveClustersDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elasticsearch_clusters: Vec<MoveClusterDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kibana_clusters: Vec<MoveClusterDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apm_clusters: Vec<MoveClusterDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appsearch_clusters: Vec<MoveClusterDetails>,
}

impl MoveClustersDetails {
    /// The entries of a single kind
    pub fn clusters(&self, kind: ResourceKind) -> &[MoveClusterDetails] {
        match kind {
            ResourceKind::Elasticsearch => &self.elasticsearch_clusters,
            ResourceKind::Kibana => &self.kibana_clusters,
            ResourceKind::Apm => &self.apm_clusters,
            ResourceKind::Appsearch => &self.appsearch_clusters,
        }
    }

    pub fn clusters_mut(&mut self, kind: ResourceKind) -> &mut Vec<MoveClusterDetails> {
        match kind {
            ResourceKind::Elasticsearch => &mut self.elasticsearch_clusters,
            ResourceKind::Kibana => &mut self.kibana_clusters,
            ResourceKind::Apm => &mut self.apm_clusters,
            ResourceKind::Appsearch => &mut self.appsearch_clusters,
        }
    }

    /// All entries, grouped by kind in [`ResourceKind`] declaration order
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &MoveClusterDetails)> {
        ResourceKind::iter().flat_map(move |kind| self.clusters(kind).iter().map(move |d| (kind, d)))
    }

    pub fn len(&self) -> usize {
        ResourceKind::iter().map(|k| self.clusters(k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Response of both move endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveClustersCommandResponse {
    /// Resources that will be (or, for a dry run, would be) moved
    #[serde(default)]
    pub moves: MoveClustersDetails,

    /// Resources the control plane refused to move
    #[serde(default)]
    pub failures: MoveClustersDetails,
}

// ============================================================================
// Move clusters request
// ============================================================================

/// Move settings for a group of resources of one kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveClusterConfiguration {
    pub cluster_ids: Vec<String>,

    /// Plan to run instead of the one the control plane would calculate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_override: Option<ClusterPlan>,
}

/// Body of the move endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveClustersRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elasticsearch_clusters: Vec<MoveClusterConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kibana_clusters: Vec<MoveClusterConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apm_clusters: Vec<MoveClusterConfiguration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appsearch_clusters: Vec<MoveClusterConfiguration>,
}

impl MoveClustersRequest {
    pub fn clusters(&self, kind: ResourceKind) -> &[MoveClusterConfiguration] {
        match kind {
            ResourceKind::Elasticsearch => &self.elasticsearch_clusters,
            ResourceKind::Kibana => &self.kibana_clusters,
            ResourceKind::Apm => &self.apm_clusters,
            ResourceKind::Appsearch => &self.appsearch_clusters,
        }
    }

    pub fn clusters_mut(&mut self, kind: ResourceKind) -> &mut Vec<MoveClusterConfiguration> {
        match kind {
            ResourceKind::Elasticsearch => &mut self.elasticsearch_clusters,
            ResourceKind::Kibana => &mut self.kibana_clusters,
            ResourceKind::Apm => &mut self.apm_clusters,
            ResourceKind::Appsearch => &mut self.appsearch_clusters,
        }
    }

    pub fn len(&self) -> usize {
        ResourceKind::iter().map(|k| self.clusters(k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A request containing only the entries of `kind`
    pub fn only(&self, kind: ResourceKind) -> Self {
        let mut req = Self::default();
        *req.clusters_mut(kind) = self.clusters(kind).to_vec();
        req
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plan_round_trips_unknown_fields() {
        let raw = json!({
            "cluster_topology": [{"memory_per_node": 1024, "zone_count": 1}],
            "elasticsearch": {"version": "7.17.0"},
            "transient": {
                "strategy": {"rolling": {"group_by": "__all__"}},
                "plan_configuration": {
                    "move_instances": [{"from": "i-1", "to": []}],
                    "skip_snapshot": false,
                    "timeout": 4096
                }
            }
        });

        let plan: ClusterPlan = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(plan.plan_configuration().unwrap().skip_snapshot, Some(false));
        assert_eq!(serde_json::to_value(&plan).unwrap(), raw);
    }

    #[test]
    fn plan_configuration_mut_creates_missing_objects() {
        let mut plan = ClusterPlan::default();
        plan.plan_configuration_mut().preferred_allocators = Some(vec!["a1".into()]);
        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({"transient": {"plan_configuration": {"preferred_allocators": ["a1"]}}})
        );
    }

    #[test]
    fn details_iterate_in_kind_order() {
        let resp: MoveClustersCommandResponse = serde_json::from_value(json!({
            "moves": {
                "kibana_clusters": [{"cluster_id": "k1"}],
                "elasticsearch_clusters": [{"cluster_id": "e1"}, {"cluster_id": "e2"}]
            }
        }))
        .unwrap();

        let ids: Vec<_> = resp
            .moves
            .iter()
            .map(|(kind, d)| (kind, d.cluster_id.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![
                (ResourceKind::Elasticsearch, "e1"),
                (ResourceKind::Elasticsearch, "e2"),
                (ResourceKind::Kibana, "k1"),
            ]
        );
        assert!(resp.failures.is_empty());
    }

    #[test]
    fn query_omits_unset_flags() {
        let q = MoveClustersQuery {
            validate_only: Some(true),
            allocator_down: None,
            move_only: Some(false),
        };
        assert_eq!(
            serde_json::to_value(q).unwrap(),
            json!({"validate_only": true, "move_only": false})
        );
    }
}
