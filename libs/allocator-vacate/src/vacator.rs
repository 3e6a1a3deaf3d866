// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Vacating a single resource
//!
//! 1. validate the work item
//! 2. ask the control plane whether the allocator is down, unless the
//!    caller forced the flag
//! 3. dry-run the allocator move to obtain the calculated plan
//! 4. build and send the typed move for this resource only
//! 5. track the plan until it finishes (unless tracking is skipped)

use std::sync::Arc;

use ece_platform_client::PlatformApi;
use ece_platform_types::MoveClustersQuery;

use crate::builder::build_move_request;
use crate::cancel::Cancellation;
use crate::error::{VacateError, check_vacate_failures};
use crate::output::{LinePrefix, completed_line, emit, failed_line, step_line};
use crate::params::VacateWorkItem;
use crate::tracker::{PlanEvent, PlanTracker, TrackerConfig};

/// How a resource vacate ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacateOutcome {
    /// The move plan ran to completion
    Completed,
    /// The move was accepted and tracking was skipped
    MoveRequested,
    /// The control plane did not list the resource as movable and reported
    /// only a plan still pending for it
    AlreadyMoving,
}

/// Vacate one resource and wait for its plan to finish
pub async fn vacate_one(
    api: &Arc<dyn PlatformApi>,
    item: &VacateWorkItem,
) -> Result<VacateOutcome, VacateError> {
    vacate_one_cancellable(api, item, &Cancellation::new()).await
}

/// [`vacate_one`], with plan tracking ending early once `cancel` is set
pub async fn vacate_one_cancellable(
    api: &Arc<dyn PlatformApi>,
    item: &VacateWorkItem,
    cancel: &Cancellation,
) -> Result<VacateOutcome, VacateError> {
    item.validate()?;
    let resource = item.resource();
    let remote = |source| VacateError::ResourceRemote {
        resource: resource.clone(),
        source,
    };

    let allocator_down = match item.allocator_down {
        Some(down) => down,
        None => api
            .get_allocator(&item.allocator_id)
            .await
            .map_err(remote)?
            .status
            .is_down(),
    };
    let tracking = item.tracking.or_defaults();

    tracing::info!(
        allocator_id = %item.allocator_id,
        resource_id = %item.resource_id,
        kind = %item.kind,
        allocator_down,
        "vacating resource"
    );

    let dry_run = api
        .move_clusters(
            &item.allocator_id,
            MoveClustersQuery {
                validate_only: Some(true),
                allocator_down: Some(allocator_down),
                move_only: Some(item.move_only),
            },
            &Default::default(),
        )
        .await
        .map_err(remote)?;

    let filter = [item.resource_id.clone()];
    let request = build_move_request(
        &dry_run.moves,
        &filter,
        &item.preferred_allocators,
        &item.plan_overrides,
    )
    .only(item.kind);

    if request.is_empty() {
        if let Some(err) = check_vacate_failures(
            &dry_run.failures,
            &item.allocator_id,
            &filter,
            Some(item.kind),
        )
        .into_iter()
        .next()
        {
            return Err(err);
        }
        // Failures left for this resource carry only the pending sentinel
        let pending = dry_run
            .failures
            .clusters(item.kind)
            .iter()
            .any(|f| f.cluster_id == item.resource_id);
        if !pending {
            tracing::warn!(
                allocator_id = %item.allocator_id,
                resource_id = %item.resource_id,
                kind = %item.kind,
                "resource not reported by the allocator dry run"
            );
            return Err(VacateError::NotMovable {
                resource: item.resource(),
            });
        }
        tracing::info!(
            resource_id = %item.resource_id,
            "resource is not movable right now, a plan is still pending"
        );
        return Ok(VacateOutcome::AlreadyMoving);
    }

    let moved = api
        .move_clusters_by_type(
            &item.allocator_id,
            item.kind,
            MoveClustersQuery {
                validate_only: None,
                allocator_down: Some(allocator_down),
                move_only: Some(item.move_only),
            },
            &request,
        )
        .await
        .map_err(remote)?;

    if let Some(err) =
        check_vacate_failures(&moved.failures, &item.allocator_id, &filter, Some(item.kind))
            .into_iter()
            .next()
    {
        return Err(err);
    }

    if item.skip_tracking {
        tracing::info!(resource_id = %item.resource_id, "move requested, not tracking");
        return Ok(VacateOutcome::MoveRequested);
    }

    let mut tracker = PlanTracker::new(
        api.clone(),
        TrackerConfig {
            resource_id: item.resource_id.clone(),
            kind: item.kind,
            poll_frequency: tracking.poll_frequency,
            max_retries: tracking.max_poll_retries,
        },
        cancel.clone(),
    );

    while let Some(event) = tracker.next_event().await {
        let deployment_id = tracker.deployment_id().unwrap_or("unknown").to_string();
        let prefix = LinePrefix {
            deployment_id: &deployment_id,
            kind: item.kind,
            resource_id: &item.resource_id,
        };

        match event {
            PlanEvent::Step(step) => emit(item.output.as_ref(), &step_line(&prefix, &step)),
            PlanEvent::Completed { total_duration } => {
                emit(item.output.as_ref(), &completed_line(&prefix, total_duration));
                tracing::info!(
                    resource_id = %item.resource_id,
                    deployment_id = %deployment_id,
                    "plan finished"
                );
                return Ok(VacateOutcome::Completed);
            }
            PlanEvent::Failed {
                step_id,
                message,
                total_duration,
            } => {
                emit(
                    item.output.as_ref(),
                    &failed_line(&prefix, &message, total_duration),
                );
                tracing::warn!(
                    resource_id = %item.resource_id,
                    deployment_id = %deployment_id,
                    step_id = %step_id,
                    "plan failed"
                );
                return Err(VacateError::PlanFailed {
                    resource,
                    deployment_id,
                    message,
                });
            }
            PlanEvent::GaveUp { retries } => {
                return Err(VacateError::TrackerGaveUp { resource, retries });
            }
            PlanEvent::Error(source) => {
                return Err(VacateError::ResourceRemote { resource, source });
            }
            PlanEvent::Cancelled => {
                return Err(VacateError::TrackerCancelled { resource });
            }
        }
    }

    // The tracker always ends with a terminal event
    Err(VacateError::TrackerCancelled { resource })
}
