// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Vacating whole allocators
//!
//! Allocators are planned one after the other: each is dry-run, its refused
//! moves are folded into the error list and every movable resource becomes
//! a work item. Items run on a [`Pool`] of `concurrency` workers. Nothing
//! short of a validation error stops the run early; all failures come back
//! together as one [`AggregateError`].

use std::collections::HashSet;
use std::sync::Arc;

use ece_platform_client::PlatformApi;
use ece_platform_types::{MoveClustersQuery, MoveClustersRequest, ResourceKind};

use crate::error::{AggregateError, VacateError, check_vacate_failures};
use crate::params::{VacateRequest, VacateWorkItem};
use crate::pool::{Pool, PoolStatus};
use crate::vacator::{VacateOutcome, vacate_one_cancellable};

/// Counts of a finished vacate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VacateSummary {
    pub allocators: usize,
    /// Resources handed to the workers
    pub resources: usize,
}

/// Vacate every allocator in `request`.
///
/// Returns the summary when every resource was vacated; otherwise every
/// collected error, in the order: planning errors, resource errors, pool
/// errors, unprocessed resources.
pub async fn vacate(
    api: Arc<dyn PlatformApi>,
    request: VacateRequest,
) -> Result<VacateSummary, AggregateError> {
    request.validate()?;

    let run_api = api.clone();
    let pool = Pool::new(
        request.concurrency,
        move |item: VacateWorkItem, cancel| {
            let api = run_api.clone();
            async move {
                let outcome = vacate_one_cancellable(&api, &item, &cancel).await?;
                if outcome == VacateOutcome::AlreadyMoving {
                    tracing::info!(resource = %item.resource(), "skipped, plan still pending");
                }
                Ok::<(), VacateError>(())
            }
        },
        request.stop_timeout,
        request.output.clone(),
    )
    .map_err(VacateError::from)?
    .with_interrupts(request.interrupts.clone());

    let mut merr = AggregateError::new();
    let mut leftovers = Vec::new();
    let mut seen = HashSet::new();
    let mut resources = 0;
    let allocators: Vec<&str> = unique(&request.allocators).collect();

    for allocator_id in allocators.iter().copied() {
        let items = match plan_allocator(api.as_ref(), &request, allocator_id, &mut merr).await {
            Some(items) => items,
            None => continue,
        };
        for item in items {
            if !seen.insert((item.allocator_id.clone(), item.kind, item.resource_id.clone())) {
                continue;
            }
            resources += 1;
            leftovers.extend(pool.add([item]));
        }
    }

    tracing::info!(
        allocators = allocators.len(),
        resources,
        concurrency = request.concurrency,
        "starting vacate"
    );
    pool.start().map_err(VacateError::from)?;

    while !leftovers.is_empty() {
        pool.wait_for_capacity().await;
        leftovers = pool.add(leftovers);
        if pool.status() >= PoolStatus::Stopping {
            break;
        }
    }

    pool.wait().await;
    merr.extend(pool.take_errors());

    if let Err(e) = pool.stop().await {
        merr.push(e);
    }
    // Errors of items cancelled while the pool was stopping
    merr.extend(pool.take_errors());

    leftovers.extend(pool.leftovers());
    for item in leftovers {
        tracing::warn!(resource = %item.resource(), "resource was not processed");
        merr.push(VacateError::NotProcessed {
            resource: item.resource(),
        });
    }

    merr.into_result(VacateSummary {
        allocators: allocators.len(),
        resources,
    })
}

/// Dry-run one allocator. Refused moves go to `merr`; the movable
/// resources that pass the filters come back as work items.
async fn plan_allocator(
    api: &dyn PlatformApi,
    request: &VacateRequest,
    allocator_id: &str,
    merr: &mut AggregateError,
) -> Option<Vec<VacateWorkItem>> {
    let query = MoveClustersQuery {
        validate_only: Some(true),
        allocator_down: request.allocator_down,
        move_only: Some(request.move_only),
    };

    let response = match api
        .move_clusters(allocator_id, query, &MoveClustersRequest::default())
        .await
    {
        Ok(response) => response,
        Err(source) => {
            tracing::warn!(allocator_id, error = %source, "dry run failed");
            merr.push(VacateError::AllocatorRemote {
                allocator_id: allocator_id.to_string(),
                source,
            });
            return None;
        }
    };

    merr.extend(check_vacate_failures(
        &response.failures,
        allocator_id,
        &request.cluster_filter,
        request.kind_filter,
    ));

    let items: Vec<VacateWorkItem> = response
        .moves
        .iter()
        .filter(|(kind, _)| selected_kind(request.kind_filter, *kind))
        .filter(|(_, m)| {
            request.cluster_filter.is_empty() || request.cluster_filter.contains(&m.cluster_id)
        })
        .map(|(kind, m)| VacateWorkItem::from_request(request, allocator_id, kind, &m.cluster_id))
        .collect();

    tracing::debug!(
        allocator_id,
        movable = response.moves.len(),
        selected = items.len(),
        "planned allocator"
    );
    Some(items)
}

fn selected_kind(filter: Option<ResourceKind>, kind: ResourceKind) -> bool {
    filter.is_none_or(|k| k == kind)
}

/// Allocator ids in order, without repeats
fn unique(ids: &[String]) -> impl Iterator<Item = &str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(String::as_str)
        .filter(move |id| seen.insert(*id))
}
