// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! `ece-adm allocator ...`

use std::sync::Arc;
use std::time::Duration;

use allocator_vacate::{
    DEFAULT_MAX_POLL_RETRIES, DEFAULT_TRACK_FREQUENCY, PlanOverrides, TrackSettings,
    VacateOutcome, VacateRequest, VacateWorkItem, stdout_sink, vacate, vacate_one,
};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ece_platform_client::types::{AllocatorInfo, ResourceKind};
use ece_platform_client::{PlatformApi, PlatformClient};

use crate::config::ConnectionArgs;

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Subcommand, Debug)]
pub enum AllocatorCommand {
    /// Move every resource off one or more allocators
    Vacate(VacateArgs),

    /// Move a single resource off an allocator
    VacateOne(VacateOneArgs),

    /// Show an allocator's health and instances
    Show {
        /// Allocator id
        allocator_id: String,

        /// Print the raw JSON document
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by `vacate` and `vacate-one`
#[derive(Args, Debug, Clone)]
pub struct MoveOptions {
    /// Preferred target allocators (repeatable)
    #[arg(long = "target")]
    pub targets: Vec<String>,

    /// Polls without plan information tolerated before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_POLL_RETRIES)]
    pub max_poll_retries: u32,

    /// Seconds between plan polls
    #[arg(long, default_value_t = DEFAULT_TRACK_FREQUENCY.as_secs())]
    pub poll_frequency: u64,

    /// Treat the allocator as down (true) or up (false); asked from the
    /// control plane when omitted
    #[arg(long)]
    pub allocator_down: Option<bool>,

    /// Keep the instance configuration, only relocate it
    #[arg(long)]
    pub move_only: bool,

    /// Return once the move was accepted, without following the plan
    #[arg(long)]
    pub skip_tracking: bool,

    /// Elasticsearch only: skip the snapshot before moving. Unset keeps the
    /// calculated plan's value; `--skip-snapshot=false` forces it off.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub skip_snapshot: Option<bool>,

    /// Elasticsearch only: skip migrating data off the old instances
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub skip_data_migration: Option<bool>,

    /// Elasticsearch only: ignore failsafe checks
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub override_failsafe: Option<bool>,
}

impl MoveOptions {
    fn overrides(&self) -> PlanOverrides {
        PlanOverrides {
            skip_snapshot: self.skip_snapshot,
            skip_data_migration: self.skip_data_migration,
            override_failsafe: self.override_failsafe,
        }
    }

    /// A request carrying these options, ready for the caller's own fields
    fn request(&self, allocators: Vec<String>) -> VacateRequest {
        let mut request = VacateRequest::new(allocators, stdout_sink());
        request.preferred_allocators = self.targets.clone();
        request.tracking = TrackSettings {
            max_poll_retries: self.max_poll_retries,
            poll_frequency: Duration::from_secs(self.poll_frequency),
        };
        request.allocator_down = self.allocator_down;
        request.move_only = self.move_only;
        request.skip_tracking = self.skip_tracking;
        request.plan_overrides = self.overrides();
        request
    }
}

#[derive(Args, Debug)]
pub struct VacateArgs {
    /// Allocators to vacate
    #[arg(required = true)]
    pub allocators: Vec<String>,

    /// Only vacate these resources (repeatable)
    #[arg(long = "resource-id", conflicts_with = "kind")]
    pub resource_ids: Vec<String>,

    /// Only vacate resources of this kind
    #[arg(long)]
    pub kind: Option<ResourceKind>,

    /// Resources moved at the same time
    #[arg(long, short = 'c', default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    #[command(flatten)]
    pub options: MoveOptions,
}

impl VacateArgs {
    fn request(&self) -> VacateRequest {
        let mut request = self.options.request(self.allocators.clone());
        request.cluster_filter = self.resource_ids.clone();
        request.kind_filter = self.kind;
        request.concurrency = self.concurrency;
        request
    }
}

#[derive(Args, Debug)]
pub struct VacateOneArgs {
    /// Allocator the resource runs on
    #[arg(long)]
    pub allocator: String,

    /// Resource to move
    #[arg(long)]
    pub resource_id: String,

    /// Kind of the resource
    #[arg(long)]
    pub kind: ResourceKind,

    #[command(flatten)]
    pub options: MoveOptions,
}

impl VacateOneArgs {
    fn work_item(&self) -> VacateWorkItem {
        let request = self.options.request(vec![self.allocator.clone()]);
        VacateWorkItem::from_request(&request, &self.allocator, self.kind, &self.resource_id)
    }
}

impl AllocatorCommand {
    pub async fn run(self, connection: &ConnectionArgs) -> Result<()> {
        let config = connection.client_config()?;
        let client = PlatformClient::new(&config).context("failed to create API client")?;
        let api: Arc<dyn PlatformApi> = Arc::new(client);

        match self {
            AllocatorCommand::Vacate(args) => run_vacate(api, &args).await,
            AllocatorCommand::VacateOne(args) => run_vacate_one(&api, &args).await,
            AllocatorCommand::Show { allocator_id, json } => {
                let allocator = api
                    .get_allocator(&allocator_id)
                    .await
                    .with_context(|| format!("failed to get allocator {}", allocator_id))?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&allocator)?);
                } else {
                    print_allocator(&allocator);
                }
                Ok(())
            }
        }
    }
}

async fn run_vacate(api: Arc<dyn PlatformApi>, args: &VacateArgs) -> Result<()> {
    let request = args.request();
    tracing::debug!(?request, "vacating allocators");

    let summary = vacate(api, request).await?;
    println!(
        "vacated {} resource(s) from {} allocator(s)",
        summary.resources, summary.allocators
    );
    Ok(())
}

async fn run_vacate_one(api: &Arc<dyn PlatformApi>, args: &VacateOneArgs) -> Result<()> {
    let item = args.work_item();
    match vacate_one(api, &item).await? {
        VacateOutcome::Completed => {}
        VacateOutcome::MoveRequested => {
            println!("move requested for {}", item.resource());
        }
        VacateOutcome::AlreadyMoving => {
            println!("{}: a plan is already pending, nothing to do", item.resource());
        }
    }
    Ok(())
}

fn print_allocator(allocator: &AllocatorInfo) {
    let status = &allocator.status;
    println!("allocator:   {}", allocator.allocator_id);
    if let Some(zone) = &allocator.zone_id {
        println!("zone:        {}", zone);
    }
    if let Some(ip) = &allocator.host_ip {
        println!("host ip:     {}", ip);
    }
    println!(
        "status:      connected={} healthy={} maintenance={}",
        status.connected, status.healthy, status.maintenance_mode
    );
    println!("instances:   {}", allocator.instances.len());
    for instance in &allocator.instances {
        println!(
            "  {:<34} {:<14} {}",
            instance.cluster_id,
            instance.cluster_type,
            instance.deployment_id.as_deref().unwrap_or("-")
        );
    }
}
