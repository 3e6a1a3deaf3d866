// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Allocator models

use serde::{Deserialize, Serialize};

/// An allocator as returned by `GET /platform/infrastructure/allocators/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocatorInfo {
    /// Allocator identifier
    pub allocator_id: String,

    /// Availability zone the allocator belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    /// Host IP of the allocator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,

    /// Connectivity and health as seen by the control plane
    pub status: AllocatorHealthStatus,

    /// Resource instances currently placed on this allocator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<AllocatorInstance>,
}

/// Health of an allocator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorHealthStatus {
    pub connected: bool,
    pub healthy: bool,
    #[serde(default)]
    pub maintenance_mode: bool,
}

impl AllocatorHealthStatus {
    /// An allocator is treated as down when it is either disconnected or
    /// unhealthy.
    pub fn is_down(&self) -> bool {
        !self.connected || !self.healthy
    }
}

/// A single resource instance running on an allocator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocatorInstance {
    pub cluster_id: String,
    pub cluster_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving: Option<bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn down_when_disconnected_or_unhealthy() {
        let status = |connected, healthy| AllocatorHealthStatus {
            connected,
            healthy,
            maintenance_mode: false,
        };
        assert!(!status(true, true).is_down());
        assert!(status(false, true).is_down());
        assert!(status(true, false).is_down());
        assert!(status(false, false).is_down());
    }

    #[test]
    fn decodes_minimal_allocator() {
        let json = r#"{"allocator_id":"i-0a1b2c","status":{"connected":true,"healthy":false}}"#;
        let info: AllocatorInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.allocator_id, "i-0a1b2c");
        assert!(info.status.is_down());
        assert!(info.instances.is_empty());
    }
}
