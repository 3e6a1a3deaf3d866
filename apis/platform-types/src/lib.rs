// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Wire models for the platform control plane.
//!
//! This crate contains the subset of the control plane's REST models that
//! the allocator vacate tooling consumes: allocator health, the move
//! clusters request/response documents, and deployment plan information.
//!
//! Plan documents are treated as mostly opaque. Only the fields the vacate
//! tooling rewrites are typed; everything else is carried through a
//! flattened JSON map so that a plan survives a deserialize/serialize round
//! trip unchanged.

mod allocator;
mod deployment;
mod moves;

pub use allocator::{AllocatorHealthStatus, AllocatorInfo, AllocatorInstance};
pub use deployment::{
    DeploymentGetResponse, DeploymentResource, DeploymentResources, DeploymentSearchHit,
    DeploymentsSearchResponse, PlanAttempt, PlanInfo, PlanStepInfo, PlanStepLogMessage,
    ResourceInfo, StepStatus,
};
pub use moves::{
    BasicFailedReply, BasicFailedReplyElement, ClusterPlan, MoveClusterConfiguration,
    MoveClusterDetails, MoveClustersCommandResponse, MoveClustersDetails, MoveClustersQuery,
    MoveClustersRequest, PlanConfiguration, TransientPlan,
};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// Resource (cluster) identifier. Always 32 characters once validated.
pub type ResourceId = String;

/// Allocator identifier (the host name of the allocator).
pub type AllocatorId = String;

/// Deployment identifier
pub type DeploymentId = String;

/// The kinds of tenant resources that can live on an allocator.
///
/// Every move is typed by exactly one kind. The lowercase form is used on
/// the wire, in URLs and in error messages; [`ResourceKind::title`] is the
/// form shown in progress output.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Elasticsearch,
    Kibana,
    Apm,
    Appsearch,
}

impl ResourceKind {
    /// Title-cased name used in progress lines
    pub fn title(self) -> &'static str {
        match self {
            Self::Elasticsearch => "Elasticsearch",
            Self::Kibana => "Kibana",
            Self::Apm => "Apm",
            Self::Appsearch => "Appsearch",
        }
    }
}
