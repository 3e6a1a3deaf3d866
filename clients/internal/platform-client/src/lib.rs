// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Platform control plane client
//!
//! This crate provides typed access to the parts of the control plane API
//! used to vacate allocators: allocator health, the move clusters endpoints,
//! and deployment plan information.
//!
//! ## Usage
//!
//! ```ignore
//! use ece_platform_client::{ClientConfig, Credentials, PlatformApi, PlatformClient};
//!
//! let config = ClientConfig::new(
//!     "https://ece.example.com:12443",
//!     Credentials::ApiKey("my-api-key".to_string()),
//! );
//! let client = PlatformClient::new(&config)?;
//!
//! let allocator = client.get_allocator("192.168.44.10").await?;
//! println!("down: {}", allocator.status.is_down());
//! ```
//!
//! Consumers should depend on the [`PlatformApi`] trait rather than on
//! [`PlatformClient`] directly so that tests can substitute an in-memory
//! implementation.

pub mod auth;
mod client;

pub use auth::Credentials;
pub use client::{ClientConfig, DEFAULT_TIMEOUT_SECS, PlatformClient};

// Re-export the wire models for convenience
pub use ece_platform_types as types;

use async_trait::async_trait;
use thiserror::Error;

use ece_platform_types::{
    AllocatorInfo, DeploymentGetResponse, MoveClustersCommandResponse, MoveClustersQuery,
    MoveClustersRequest, ResourceKind,
};

/// Client errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested object does not exist (HTTP 404 or an empty search)
    #[error("{0} not found")]
    NotFound(String),

    /// The request could not be sent or the response body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The control plane answered with a non-success status
    #[error("{}", format_status(.status, .code, .message))]
    Status {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    /// The response body was not the expected document
    #[error("failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    /// The client could not be constructed
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

fn format_status(status: &u16, code: &Option<String>, message: &Option<String>) -> String {
    match (code.as_deref(), message.as_deref()) {
        (Some(code), Some(message)) => {
            format!("api error (status {status}): code: {code}, message: {message}")
        }
        (None, Some(message)) => format!("api error (status {status}): {message}"),
        _ => format!("api error (status {status})"),
    }
}

/// The control plane operations the vacate tooling depends on.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// `GET /platform/infrastructure/allocators/{id}`
    async fn get_allocator(&self, allocator_id: &str) -> Result<AllocatorInfo, ApiError>;

    /// `POST /platform/infrastructure/allocators/{id}/clusters/_move`
    ///
    /// With `validate_only` set this is a dry run that returns the
    /// tentative move set without moving anything.
    async fn move_clusters(
        &self,
        allocator_id: &str,
        query: MoveClustersQuery,
        body: &MoveClustersRequest,
    ) -> Result<MoveClustersCommandResponse, ApiError>;

    /// `POST /platform/infrastructure/allocators/{id}/clusters/_move/{kind}`
    async fn move_clusters_by_type(
        &self,
        allocator_id: &str,
        kind: ResourceKind,
        query: MoveClustersQuery,
        body: &MoveClustersRequest,
    ) -> Result<MoveClustersCommandResponse, ApiError>;

    /// Find the deployment that owns a resource
    async fn find_deployment_id(
        &self,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<String, ApiError>;

    /// `GET /deployments/{id}` including plan attempt logs
    async fn get_deployment(&self, deployment_id: &str)
    -> Result<DeploymentGetResponse, ApiError>;
}
