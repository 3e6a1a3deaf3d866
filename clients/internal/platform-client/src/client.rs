// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! reqwest-backed implementation of [`PlatformApi`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use ece_platform_types::{
    AllocatorInfo, BasicFailedReply, DeploymentGetResponse, DeploymentsSearchResponse,
    MoveClustersCommandResponse, MoveClustersQuery, MoveClustersRequest, ResourceKind,
};

use crate::{ApiError, Credentials, PlatformApi};

/// Default HTTP request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`PlatformClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Control plane address, e.g. `https://ece.example.com:12443`. A
    /// missing scheme defaults to https; `/api/v1` is appended unless
    /// already present.
    pub host: String,
    pub credentials: Credentials,
    pub timeout: Duration,
    /// Skip TLS certificate verification
    pub insecure: bool,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            insecure: false,
        }
    }
}

/// Authenticated control plane client
#[derive(Clone)]
pub struct PlatformClient {
    client: Client,
    api_root: Url,
}

impl PlatformClient {
    /// Create a new client. No request is made until the first call.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        // Fails harmlessly if a provider is already installed
        let _ = rustls::crypto::ring::default_provider().install_default();

        let api_root = api_root(&config.host)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("ece-adm/", env!("CARGO_PKG_VERSION")))
            .default_headers(config.credentials.default_headers()?)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self { client, api_root })
    }

    /// The resolved API root (ends in `/api/v1`)
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidConfig(format!("{} cannot be a base URL", self.api_root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn move_endpoint(
        &self,
        allocator_id: &str,
        kind: Option<ResourceKind>,
        query: MoveClustersQuery,
    ) -> Result<Url, ApiError> {
        let kind_segment = kind.map(|k| k.to_string());
        let mut segments = vec![
            "platform",
            "infrastructure",
            "allocators",
            allocator_id,
            "clusters",
            "_move",
        ];
        if let Some(kind) = &kind_segment {
            segments.push(kind);
        }
        let mut url = self.endpoint(&segments)?;

        let pairs: Vec<(&str, bool)> = [
            ("validate_only", query.validate_only),
            ("allocator_down", query.allocator_down),
            ("move_only", query.move_only),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();

        if !pairs.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (name, value) in pairs {
                qp.append_pair(name, if value { "true" } else { "false" });
            }
        }
        Ok(url)
    }
}

/// Normalise a configured host into the API root URL
fn api_root(host: &str) -> Result<Url, ApiError> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(ApiError::InvalidConfig("host is empty".to_string()));
    }

    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| ApiError::InvalidConfig(format!("invalid host {:?}: {}", host, e)))?;

    if !url.path().trim_end_matches('/').ends_with("/api/v1") {
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidConfig(format!("{} cannot be a base URL", host)))?
            .pop_if_empty()
            .extend(["api", "v1"]);
    }
    Ok(url)
}

/// Turn a response into a typed document or an [`ApiError`]
async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }

    let body = response.bytes().await?;

    if !status.is_success() {
        let first = serde_json::from_slice::<BasicFailedReply>(&body)
            .ok()
            .and_then(|reply| reply.errors.into_iter().next());
        tracing::debug!(status = %status, what, "control plane returned an error");
        return Err(ApiError::Status {
            status: status.as_u16(),
            code: first.as_ref().map(|e| e.code.clone()),
            message: first.map(|e| e.message),
        });
    }

    serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
        what: what.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn get_allocator(&self, allocator_id: &str) -> Result<AllocatorInfo, ApiError> {
        let url = self.endpoint(&["platform", "infrastructure", "allocators", allocator_id])?;
        tracing::debug!(allocator_id, "fetching allocator");

        let response = self.client.get(url).send().await?;
        decode(response, &format!("allocator {}", allocator_id)).await
    }

    async fn move_clusters(
        &self,
        allocator_id: &str,
        query: MoveClustersQuery,
        body: &MoveClustersRequest,
    ) -> Result<MoveClustersCommandResponse, ApiError> {
        let url = self.move_endpoint(allocator_id, None, query)?;
        tracing::debug!(allocator_id, query = ?query, "moving clusters");

        let response = self.client.post(url).json(body).send().await?;
        decode(response, &format!("allocator {}", allocator_id)).await
    }

    async fn move_clusters_by_type(
        &self,
        allocator_id: &str,
        kind: ResourceKind,
        query: MoveClustersQuery,
        body: &MoveClustersRequest,
    ) -> Result<MoveClustersCommandResponse, ApiError> {
        let url = self.move_endpoint(allocator_id, Some(kind), query)?;
        tracing::debug!(allocator_id, kind = %kind, query = ?query, "moving clusters by type");

        let response = self.client.post(url).json(body).send().await?;
        decode(response, &format!("allocator {}", allocator_id)).await
    }

    async fn find_deployment_id(
        &self,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(&["deployments", "_search"])?;

        let mut term = serde_json::Map::new();
        term.insert(
            format!("resources.{}.id", kind),
            json!({ "value": resource_id }),
        );
        let query = json!({
            "size": 1,
            "query": {
                "nested": {
                    "path": format!("resources.{}", kind),
                    "query": { "term": term }
                }
            }
        });

        tracing::debug!(resource_id, kind = %kind, "searching deployment for resource");
        let response = self.client.post(url).json(&query).send().await?;
        let what = format!("deployment for {} resource {}", kind, resource_id);
        let found: DeploymentsSearchResponse = decode(response, &what).await?;

        found
            .deployments
            .into_iter()
            .next()
            .map(|hit| hit.id)
            .ok_or(ApiError::NotFound(what))
    }

    async fn get_deployment(
        &self,
        deployment_id: &str,
    ) -> Result<DeploymentGetResponse, ApiError> {
        let mut url = self.endpoint(&["deployments", deployment_id])?;
        url.query_pairs_mut()
            .append_pair("show_plans", "true")
            .append_pair("show_plan_logs", "true");

        tracing::debug!(deployment_id, "fetching deployment plans");
        let response = self.client.get(url).send().await?;
        decode(response, &format!("deployment {}", deployment_id)).await
    }
}
