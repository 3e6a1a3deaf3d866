// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Turns a dry-run move set into the body of a real move request.

use std::collections::HashSet;

use ece_platform_types::{
    ClusterPlan, MoveClusterConfiguration, MoveClustersDetails, MoveClustersRequest, ResourceKind,
};
use strum::IntoEnumIterator;

use crate::params::PlanOverrides;

/// Build the move request for the resources of `tentative` that pass
/// `cluster_filter` (all of them when the filter is empty).
///
/// Each selected resource gets one configuration carrying the plan the
/// control plane calculated, with `preferred_allocators` (when non-empty)
/// and, for Elasticsearch, the set `overrides` written into its plan
/// configuration. Everything else in the plan is passed through untouched.
pub fn build_move_request(
    tentative: &MoveClustersDetails,
    cluster_filter: &[String],
    preferred_allocators: &[String],
    overrides: &PlanOverrides,
) -> MoveClustersRequest {
    let mut request = MoveClustersRequest::default();

    for kind in ResourceKind::iter() {
        let mut seen = HashSet::new();
        for details in tentative.clusters(kind) {
            if !cluster_filter.is_empty() && !cluster_filter.contains(&details.cluster_id) {
                continue;
            }
            if !seen.insert(details.cluster_id.as_str()) {
                continue;
            }

            let plan_override = details.calculated_plan.clone().map(|mut plan| {
                apply_settings(&mut plan, kind, preferred_allocators, overrides);
                plan
            });

            request.clusters_mut(kind).push(MoveClusterConfiguration {
                cluster_ids: vec![details.cluster_id.clone()],
                plan_override,
            });
        }
    }

    request
}

fn apply_settings(
    plan: &mut ClusterPlan,
    kind: ResourceKind,
    preferred_allocators: &[String],
    overrides: &PlanOverrides,
) {
    if !preferred_allocators.is_empty() {
        plan.plan_configuration_mut().preferred_allocators = Some(preferred_allocators.to_vec());
    }

    if kind != ResourceKind::Elasticsearch || overrides.is_empty() {
        return;
    }

    let config = plan.plan_configuration_mut();
    if let Some(v) = overrides.skip_snapshot {
        config.skip_snapshot = Some(v);
    }
    if let Some(v) = overrides.skip_data_migration {
        config.skip_data_migration = Some(v);
    }
    if let Some(v) = overrides.override_failsafe {
        config.override_failsafe = Some(v);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ece_platform_types::MoveClusterDetails;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ES_ID: &str = "3ee11eb40eda22cac0cce259625c6734";
    const KB_ID: &str = "6f0a2c7b5e3d4a1b9c8d7e6f5a4b3c2d";

    fn plan() -> ClusterPlan {
        serde_json::from_value(json!({
            "cluster_topology": [{"instance_configuration_id": "data.default", "size": {"value": 4096}}],
            "elasticsearch": {"version": "8.15.0"},
            "transient": {
                "strategy": {"grow_and_shrink": {}},
                "plan_configuration": {"move_only": true, "timeout": 4096}
            }
        }))
        .unwrap()
    }

    fn tentative() -> MoveClustersDetails {
        let entry = |id: &str| MoveClusterDetails {
            cluster_id: id.to_string(),
            calculated_plan: Some(plan()),
            errors: None,
        };
        MoveClustersDetails {
            elasticsearch_clusters: vec![entry(ES_ID)],
            kibana_clusters: vec![entry(KB_ID)],
            ..Default::default()
        }
    }

    #[test]
    fn plans_pass_through_untouched() {
        let request = build_move_request(&tentative(), &[], &[], &PlanOverrides::default());
        assert_eq!(request.len(), 2);

        let es = &request.elasticsearch_clusters[0];
        assert_eq!(es.cluster_ids, vec![ES_ID.to_string()]);
        assert_eq!(
            serde_json::to_value(es.plan_override.as_ref().unwrap()).unwrap(),
            serde_json::to_value(plan()).unwrap()
        );
    }

    #[test]
    fn preferred_allocators_apply_to_every_kind() {
        let preferred = vec!["A3".to_string(), "A4".to_string()];
        let request = build_move_request(&tentative(), &[], &preferred, &PlanOverrides::default());

        for kind in [ResourceKind::Elasticsearch, ResourceKind::Kibana] {
            let plan = request.clusters(kind)[0].plan_override.as_ref().unwrap();
            let config = plan.plan_configuration().unwrap();
            assert_eq!(config.preferred_allocators.as_ref(), Some(&preferred));
            assert_eq!(config.other.get("timeout"), Some(&json!(4096)));
        }
    }

    #[test]
    fn overrides_only_touch_elasticsearch() {
        let overrides = PlanOverrides {
            skip_snapshot: Some(true),
            skip_data_migration: None,
            override_failsafe: Some(false),
        };
        let request = build_move_request(&tentative(), &[], &[], &overrides);

        let es = request.elasticsearch_clusters[0].plan_override.as_ref().unwrap();
        let config = es.plan_configuration().unwrap();
        assert_eq!(config.skip_snapshot, Some(true));
        assert_eq!(config.skip_data_migration, None);
        assert_eq!(config.override_failsafe, Some(false));

        let kb = request.kibana_clusters[0].plan_override.as_ref().unwrap();
        assert_eq!(kb.plan_configuration().unwrap().skip_snapshot, None);
    }

    #[test]
    fn filter_and_duplicates() {
        let mut moves = tentative();
        moves
            .elasticsearch_clusters
            .push(moves.elasticsearch_clusters[0].clone());

        let request = build_move_request(&moves, &[], &[], &PlanOverrides::default());
        assert_eq!(request.elasticsearch_clusters.len(), 1);

        let only_kibana =
            build_move_request(&moves, &[KB_ID.to_string()], &[], &PlanOverrides::default());
        assert_eq!(only_kibana.len(), 1);
        assert_eq!(only_kibana.kibana_clusters[0].cluster_ids[0], KB_ID);
    }

    #[test]
    fn missing_plan_is_left_to_the_control_plane() {
        let moves = MoveClustersDetails {
            apm_clusters: vec![MoveClusterDetails {
                cluster_id: ES_ID.to_string(),
                calculated_plan: None,
                errors: None,
            }],
            ..Default::default()
        };
        let request = build_move_request(&moves, &[], &["A9".to_string()], &PlanOverrides::default());
        assert_eq!(request.apm_clusters[0].plan_override, None);
    }

    #[test]
    fn empty_move_set() {
        let request = build_move_request(
            &MoveClustersDetails::default(),
            &[],
            &[],
            &PlanOverrides::default(),
        );
        assert!(request.is_empty());
    }
}
