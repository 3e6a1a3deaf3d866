// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Vacate error taxonomy
//!
//! Errors never abort a vacate early. Each failure is returned as a value,
//! collected by the worker pool and folded into an [`AggregateError`] by the
//! coordinator.

use std::fmt;
use std::time::Duration;

use ece_platform_client::ApiError;
use ece_platform_types::{MoveClustersDetails, ResourceKind};
use thiserror::Error;

/// Message the control plane returns when a resource already has a plan
/// running. It is transient and never reported as a vacate failure.
pub const PLAN_STILL_PENDING: &str =
    "There is a plan still pending, cancel that or wait for it to complete before restarting";

/// Whether a control plane failure message is the "plan still pending"
/// sentinel.
pub fn is_plan_still_pending(message: &str) -> bool {
    message.contains(PLAN_STILL_PENDING)
}

/// Identifies one resource on one allocator in error messages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub allocator_id: String,
    pub resource_id: String,
    pub kind: ResourceKind,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocator {}: resource id [{}][{}]",
            self.allocator_id, self.resource_id, self.kind
        )
    }
}

/// A structured reason the control plane gave for refusing a move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub code: String,
    pub message: String,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code: {}, message: {}", self.code, self.message)
    }
}

/// Worker pool errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("pool: size must be at least 1")]
    InvalidSize,

    #[error("pool: cannot start a pool that is {0}")]
    NotIdle(crate::pool::PoolStatus),

    #[error("pool: workers did not stop within {0:?}")]
    StopTimedOut(Duration),
}

/// Everything that can go wrong while vacating
#[derive(Debug, Error)]
pub enum VacateError {
    /// Preflight check failed
    #[error("{0}")]
    Validation(String),

    /// A call made on behalf of a whole allocator failed
    #[error("allocator {allocator_id}: {source}")]
    AllocatorRemote {
        allocator_id: String,
        #[source]
        source: ApiError,
    },

    /// A call made on behalf of a single resource failed
    #[error("{resource}: {source}")]
    ResourceRemote {
        resource: ResourceRef,
        #[source]
        source: ApiError,
    },

    /// The control plane refused to move the resource
    #[error("{resource} failed vacating, reason: {}", join_reasons(.reasons))]
    MoveFailed {
        resource: ResourceRef,
        reasons: Vec<FailureReason>,
    },

    /// The dry run neither offered a move for the resource nor refused one
    #[error("{resource}: not found among the allocator's resources, check the resource id and kind")]
    NotMovable { resource: ResourceRef },

    /// The move was accepted but a plan step failed
    #[error("{resource}: deployment [{deployment_id}] plan failed: {message}")]
    PlanFailed {
        resource: ResourceRef,
        deployment_id: String,
        message: String,
    },

    /// The control plane kept reporting that there is no plan to track
    #[error("{resource}: gave up tracking the plan after {retries} retries, no plan found")]
    TrackerGaveUp { resource: ResourceRef, retries: u32 },

    /// Plan tracking was cancelled before the plan finished
    #[error("{resource}: plan tracking cancelled, the move may still be running")]
    TrackerCancelled { resource: ResourceRef },

    /// The item was queued but the pool stopped before running it
    #[error("{resource}: was either cancelled or not processed, follow up accordingly")]
    NotProcessed { resource: ResourceRef },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

fn join_reasons(reasons: &[FailureReason]) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl VacateError {
    /// The resource this error is about, if it concerns a single one
    pub fn resource(&self) -> Option<&ResourceRef> {
        match self {
            Self::ResourceRemote { resource, .. }
            | Self::MoveFailed { resource, .. }
            | Self::NotMovable { resource }
            | Self::PlanFailed { resource, .. }
            | Self::TrackerGaveUp { resource, .. }
            | Self::TrackerCancelled { resource }
            | Self::NotProcessed { resource } => Some(resource),
            Self::Validation(_) | Self::AllocatorRemote { .. } | Self::Pool(_) => None,
        }
    }
}

/// Fold the `failures` half of a move response into errors.
///
/// Only resources in `cluster_filter` (when non-empty) and of `kind_filter`
/// (when set) are considered. "Plan still pending" reasons are dropped. A
/// failure entry that carries no reasons at all is still reported, with an
/// `unknown` code.
pub fn check_vacate_failures(
    failures: &MoveClustersDetails,
    allocator_id: &str,
    cluster_filter: &[String],
    kind_filter: Option<ResourceKind>,
) -> Vec<VacateError> {
    let mut errors = Vec::new();

    for (kind, failure) in failures.iter() {
        if kind_filter.is_some_and(|k| k != kind) {
            continue;
        }
        if !cluster_filter.is_empty() && !cluster_filter.contains(&failure.cluster_id) {
            continue;
        }

        let elements = failure
            .errors
            .as_ref()
            .map(|reply| reply.errors.as_slice())
            .unwrap_or_default();

        let resource = ResourceRef {
            allocator_id: allocator_id.to_string(),
            resource_id: failure.cluster_id.clone(),
            kind,
        };

        if elements.is_empty() {
            errors.push(VacateError::MoveFailed {
                resource,
                reasons: vec![FailureReason {
                    code: "unknown".to_string(),
                    message: "the control plane reported a failure without details".to_string(),
                }],
            });
            continue;
        }

        let reasons: Vec<FailureReason> = elements
            .iter()
            .filter(|e| !is_plan_still_pending(&e.message))
            .map(|e| FailureReason {
                code: e.code.clone(),
                message: e.message.clone(),
            })
            .collect();

        if reasons.is_empty() {
            tracing::debug!(
                resource = %resource,
                "ignoring plan still pending failure"
            );
            continue;
        }

        errors.push(VacateError::MoveFailed { resource, reasons });
    }

    errors
}

/// An ordered list of vacate errors
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<VacateError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: impl Into<VacateError>) {
        self.errors.push(error.into());
    }

    pub fn errors(&self) -> &[VacateError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<VacateError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(value)` when no error was collected
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl Extend<VacateError> for AggregateError {
    fn extend<I: IntoIterator<Item = VacateError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl From<VacateError> for AggregateError {
    fn from(error: VacateError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => return write!(f, "no errors"),
            1 => write!(f, "1 error occurred:")?,
            n => write!(f, "{} errors occurred:", n)?,
        }
        for error in &self.errors {
            write!(f, "\n\t* {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ece_platform_types::{BasicFailedReply, BasicFailedReplyElement, MoveClusterDetails};
    use pretty_assertions::assert_eq;

    const ES_ID: &str = "3ee11eb40eda22cac0cce259625c6734";
    const KB_ID: &str = "6f0a2c7b5e3d4a1b9c8d7e6f5a4b3c2d";

    fn failure(id: &str, messages: &[(&str, &str)]) -> MoveClusterDetails {
        MoveClusterDetails {
            cluster_id: id.to_string(),
            calculated_plan: None,
            errors: Some(BasicFailedReply {
                errors: messages
                    .iter()
                    .map(|(code, message)| BasicFailedReplyElement {
                        code: code.to_string(),
                        message: message.to_string(),
                        fields: None,
                    })
                    .collect(),
            }),
        }
    }

    #[test]
    fn move_failure_message() {
        let failures = MoveClustersDetails {
            elasticsearch_clusters: vec![failure(ES_ID, &[("a code", "a message")])],
            ..Default::default()
        };
        let errors = check_vacate_failures(&failures, "A1", &[], None);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            format!(
                "allocator A1: resource id [{}][elasticsearch] failed vacating, reason: code: a code, message: a message",
                ES_ID
            )
        );
    }

    #[test]
    fn plan_still_pending_is_filtered() {
        let pending = format!("{} (deployment busy)", PLAN_STILL_PENDING);
        let failures = MoveClustersDetails {
            elasticsearch_clusters: vec![failure(ES_ID, &[("clusters.plan_pending", &pending)])],
            kibana_clusters: vec![failure(
                KB_ID,
                &[("clusters.plan_pending", &pending), ("other", "boom")],
            )],
            ..Default::default()
        };
        let errors = check_vacate_failures(&failures, "A1", &[], None);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("code: other, message: boom"));
        assert!(!errors[0].to_string().contains(PLAN_STILL_PENDING));
    }

    #[test]
    fn filters_restrict_failures() {
        let failures = MoveClustersDetails {
            elasticsearch_clusters: vec![failure(ES_ID, &[("c", "m")])],
            kibana_clusters: vec![failure(KB_ID, &[("c", "m")])],
            ..Default::default()
        };
        let only_kibana = check_vacate_failures(&failures, "A1", &[KB_ID.to_string()], None);
        assert_eq!(only_kibana.len(), 1);
        assert_eq!(only_kibana[0].resource().unwrap().kind, ResourceKind::Kibana);

        let es_kind = check_vacate_failures(&failures, "A1", &[], Some(ResourceKind::Elasticsearch));
        assert_eq!(es_kind.len(), 1);
        assert_eq!(es_kind[0].resource().unwrap().resource_id, ES_ID);
    }

    #[test]
    fn failure_without_reasons_is_reported() {
        let failures = MoveClustersDetails {
            apm_clusters: vec![MoveClusterDetails {
                cluster_id: ES_ID.to_string(),
                calculated_plan: None,
                errors: None,
            }],
            ..Default::default()
        };
        let errors = check_vacate_failures(&failures, "A1", &[], None);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("code: unknown"));
    }

    #[test]
    fn aggregate_display_and_result() {
        let mut merr = AggregateError::new();
        assert!(AggregateError::new().into_result(()).is_ok());

        merr.push(VacateError::Validation("bad filter".into()));
        merr.push(PoolError::StopTimedOut(Duration::from_secs(5)));
        assert_eq!(
            merr.to_string(),
            "2 errors occurred:\n\t* bad filter\n\t* pool: workers did not stop within 5s"
        );
        assert_eq!(merr.into_result(()).unwrap_err().len(), 2);
    }
}
