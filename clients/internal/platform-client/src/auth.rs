// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Authentication header construction
//!
//! The control plane accepts either an API key or basic credentials. The
//! header is built once and installed as a default header on the HTTP
//! client, so every request carries it.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::ApiError;

/// Credentials used to authenticate against the control plane
#[derive(Clone)]
pub enum Credentials {
    /// `Authorization: ApiKey <key>`
    ApiKey(String),
    /// `Authorization: Basic <base64(user:pass)>`
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secrets
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credentials::Basic { username, .. } => {
                write!(f, "Basic {{ username: {:?}, .. }}", username)
            }
        }
    }
}

impl Credentials {
    /// Value of the `Authorization` header
    pub fn header_value(&self) -> Result<HeaderValue, ApiError> {
        let raw = match self {
            Credentials::ApiKey(key) => {
                if key.trim().is_empty() {
                    return Err(ApiError::InvalidConfig("API key is empty".to_string()));
                }
                format!("ApiKey {}", key.trim())
            }
            Credentials::Basic { username, password } => {
                if username.is_empty() {
                    return Err(ApiError::InvalidConfig("username is empty".to_string()));
                }
                let encoded = STANDARD.encode(format!("{}:{}", username, password).as_bytes());
                format!("Basic {}", encoded)
            }
        };

        let mut value = HeaderValue::from_str(&raw)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid credentials: {}", e)))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Default headers for an authenticated client
    pub fn default_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.header_value()?);
        Ok(headers)
    }
}
