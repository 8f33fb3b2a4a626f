//! Configuration management for the catalog service
//!
//! Provides presets for the usual deployments and a `validate()` pass that
//! the binary runs before touching the network.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Records endpoint of the Paris "arbres remarquables" dataset
pub const PARIS_TREES_ENDPOINT: &str = "https://opendata.paris.fr/api/explore/v2.1/catalog/datasets/arbres-remarquables-du-patrimoine-arboricole-de-paris/records";

/// Largest page the records endpoint serves
pub const MAX_PAGE_SIZE: usize = 100;

/// Remote dataset settings
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Records endpoint, queried with `limit` and `offset`
    pub endpoint: String,
    /// Records per page request
    pub page_size: usize,
    /// Corpus size to cover when the server does not report `total_count`
    pub corpus_size: usize,
    /// Global timeout of one page request
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: PARIS_TREES_ENDPOINT.to_string(),
            page_size: MAX_PAGE_SIZE,
            corpus_size: 200,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Service configuration with deployment presets
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub bind_addr: String,
    /// Request worker threads
    pub workers: usize,
    /// Local seed file, skipped when None
    pub seed_path: Option<PathBuf>,
    /// Remote dataset, skipped when None
    pub remote: Option<RemoteConfig>,
}

impl Config {
    /// Paris open data plus the bundled seed snapshot
    pub fn paris() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            workers: 4,
            seed_path: Some(PathBuf::from("data/trees.json")),
            remote: Some(RemoteConfig::default()),
        }
    }

    /// Seed snapshot only, no network access
    pub fn offline() -> Self {
        Self {
            remote: None,
            ..Self::paris()
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> ServiceResult<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(ServiceError::Config("bind_addr must not be empty".into()));
        }
        if self.workers == 0 || self.workers > 256 {
            return Err(ServiceError::Config("workers must be in [1, 256]".into()));
        }
        if let Some(remote) = &self.remote {
            if remote.endpoint.trim().is_empty() {
                return Err(ServiceError::Config("remote endpoint must not be empty".into()));
            }
            if remote.page_size == 0 || remote.page_size > MAX_PAGE_SIZE {
                return Err(ServiceError::Config(format!(
                    "page_size must be in [1, {}]",
                    MAX_PAGE_SIZE
                )));
            }
            if remote.corpus_size == 0 {
                return Err(ServiceError::Config("corpus_size must be > 0".into()));
            }
            if remote.timeout.is_zero() {
                return Err(ServiceError::Config("remote timeout must be > 0".into()));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::paris() }
}
