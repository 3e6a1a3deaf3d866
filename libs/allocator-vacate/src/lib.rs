// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Allocator vacate
//!
//! Moves every resource off one or more allocators, then follows each
//! resulting plan until it completes or fails.
//!
//! ## Components
//!
//! - [`build_move_request`]: dry-run move set to move request
//! - [`PlanTracker`]: polls a resource's plan and emits step events
//! - [`vacate_one`]: move and track a single resource
//! - [`Pool`]: bounded worker pool with interrupt handling
//! - [`vacate`]: plan every allocator and run the moves on the pool
//!
//! All control plane access goes through [`ece_platform_client::PlatformApi`]
//! so that tests can substitute an in-memory implementation.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use allocator_vacate::{VacateRequest, stdout_sink, vacate};
//!
//! let mut request = VacateRequest::new(vec!["192.168.44.10".into()], stdout_sink());
//! request.concurrency = 4;
//! match vacate(Arc::new(client), request).await {
//!     Ok(summary) => println!("vacated {} resource(s)", summary.resources),
//!     Err(errors) => eprintln!("{}", errors),
//! }
//! ```

pub mod builder;
pub mod cancel;
pub mod coordinator;
pub mod error;
pub mod output;
pub mod params;
pub mod pool;
pub mod tracker;
pub mod vacator;

pub use builder::build_move_request;
pub use cancel::{Cancellation, InterruptSource, Interrupter};
pub use coordinator::{VacateSummary, vacate};
pub use error::{
    AggregateError, FailureReason, PLAN_STILL_PENDING, PoolError, ResourceRef, VacateError,
    check_vacate_failures, is_plan_still_pending,
};
pub use output::{MemorySink, OutputSink, WriterSink, format_duration, stdout_sink};
pub use params::{
    DEFAULT_MAX_POLL_RETRIES, DEFAULT_STOP_TIMEOUT, DEFAULT_TRACK_FREQUENCY, PlanOverrides,
    RESOURCE_ID_LEN, TrackSettings, VacateRequest, VacateWorkItem,
};
pub use pool::{Pool, PoolState, PoolStatus};
pub use tracker::{PlanEvent, PlanTracker, StepEvent, TrackerConfig};
pub use vacator::{VacateOutcome, vacate_one, vacate_one_cancellable};
