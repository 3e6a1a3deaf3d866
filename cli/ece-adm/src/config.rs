// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Connection configuration
//!
//! Priority, highest first:
//! 1. command line flags
//! 2. environment variables (`ECE_HOST`, `ECE_API_KEY`, ...)
//! 3. the JSON config file (`--config`, `ECE_CONFIG`, or
//!    `<config dir>/ece-adm/config.json`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use ece_platform_client::auth::Credentials;
use ece_platform_client::{ClientConfig, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;

/// Connection flags shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Control plane address, e.g. https://ece.example.com:12443
    #[arg(long, global = true, env = "ECE_HOST")]
    pub host: Option<String>,

    /// API key
    #[arg(long, global = true, env = "ECE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Username, used with --pass when no API key is set
    #[arg(long, global = true, env = "ECE_USER")]
    pub user: Option<String>,

    /// Password for --user
    #[arg(long, global = true, env = "ECE_PASS", hide_env_values = true)]
    pub pass: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, env = "ECE_INSECURE")]
    pub insecure: bool,

    /// HTTP request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Path to a JSON config file
    #[arg(long, global = true, env = "ECE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Contents of the config file. Every field is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub insecure: Option<bool>,
    pub timeout: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// The default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ece-adm").join("config.json"))
}

impl ConnectionArgs {
    /// The config file contents. An explicitly named file must exist; the
    /// default one is optional.
    fn file_config(&self) -> Result<FileConfig> {
        if let Some(path) = &self.config {
            return FileConfig::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => FileConfig::load(&path),
            _ => Ok(FileConfig::default()),
        }
    }

    /// Merge flags, environment and config file into a client config
    pub fn client_config(&self) -> Result<ClientConfig> {
        let file = self.file_config()?;
        self.merge(file)
    }

    fn merge(&self, file: FileConfig) -> Result<ClientConfig> {
        let host = self.host.clone().or(file.host).ok_or_else(|| {
            anyhow::anyhow!("no control plane host configured, use --host or ECE_HOST")
        })?;

        let api_key = self.api_key.clone().or(file.api_key);
        let user = self.user.clone().or(file.user);
        let pass = self.pass.clone().or(file.pass);

        let credentials = match (api_key, user, pass) {
            (Some(key), _, _) => Credentials::ApiKey(key),
            (None, Some(username), Some(password)) => Credentials::Basic { username, password },
            (None, Some(_), None) => anyhow::bail!("--user requires --pass (or ECE_PASS)"),
            _ => anyhow::bail!(
                "no credentials configured, use --api-key or --user and --pass"
            ),
        };

        let mut config = ClientConfig::new(host, credentials);
        config.insecure = self.insecure || file.insecure.unwrap_or(false);
        config.timeout =
            Duration::from_secs(self.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS));
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn flags_override_file() {
        let args = ConnectionArgs {
            host: Some("https://flag.example.com".into()),
            timeout: Some(5),
            ..Default::default()
        };
        let file = FileConfig {
            host: Some("https://file.example.com".into()),
            api_key: Some("file-key".into()),
            insecure: Some(true),
            ..Default::default()
        };
        let config = args.merge(file).unwrap();
        assert_eq!(config.host, "https://flag.example.com");
        assert!(matches!(config.credentials, Credentials::ApiKey(ref k) if k == "file-key"));
        assert!(config.insecure);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn api_key_wins_over_basic() {
        let args = ConnectionArgs {
            host: Some("h".into()),
            api_key: Some("k".into()),
            user: Some("admin".into()),
            pass: Some("p".into()),
            ..Default::default()
        };
        let config = args.merge(FileConfig::default()).unwrap();
        assert!(matches!(config.credentials, Credentials::ApiKey(_)));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn basic_credentials() {
        let args = ConnectionArgs {
            host: Some("h".into()),
            user: Some("admin".into()),
            pass: Some("changeme".into()),
            ..Default::default()
        };
        let config = args.merge(FileConfig::default()).unwrap();
        assert!(
            matches!(config.credentials, Credentials::Basic { ref username, .. } if username == "admin")
        );
    }

    #[test]
    fn missing_settings_are_errors() {
        let no_host = ConnectionArgs {
            api_key: Some("k".into()),
            ..Default::default()
        };
        let err = no_host.merge(FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no control plane host"));

        let no_pass = ConnectionArgs {
            host: Some("h".into()),
            user: Some("admin".into()),
            ..Default::default()
        };
        let err = no_pass.merge(FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("--user requires --pass"));

        let nothing = ConnectionArgs {
            host: Some("h".into()),
            ..Default::default()
        };
        assert!(nothing.merge(FileConfig::default()).is_err());
    }

    #[test]
    fn loads_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"host": "ece.example.com:12443", "user": "admin", "pass": "pw", "timeout": 10}}"#
        )
        .unwrap();

        let args = ConnectionArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = args.client_config().unwrap();
        assert_eq!(config.host, "ece.example.com:12443");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hots": "typo"}}"#).unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_named_config_file_is_an_error() {
        let args = ConnectionArgs {
            config: Some(PathBuf::from("/nonexistent/ece-adm.json")),
            host: Some("h".into()),
            api_key: Some("k".into()),
            ..Default::default()
        };
        let err = args.client_config().unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
