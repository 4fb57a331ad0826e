use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::util::{is_local_endpoint_url, parse_endpoint};

pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8090";
const ENDPOINT_ENV: &str = "WSCHAT_ENDPOINT";
const STALL_TIMEOUT_ENV: &str = "WSCHAT_STALL_TIMEOUT_SECS";
const SEED_FILE_ENV: &str = "WSCHAT_SEED_FILE";

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub stall_timeout: Option<Duration>,
    pub seed_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let endpoint = non_empty_env(ENDPOINT_ENV).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let stall_timeout = non_empty_env(STALL_TIMEOUT_ENV)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{STALL_TIMEOUT_ENV} must be whole seconds, got '{raw}'"))
            })
            .transpose()?;
        let seed_file = non_empty_env(SEED_FILE_ENV).map(PathBuf::from);

        Ok(Self {
            endpoint,
            stall_timeout,
            seed_file,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let url = parse_endpoint(&self.endpoint)?;
        if url.scheme() != "ws" {
            bail!(
                "Invalid {ENDPOINT_ENV} '{}': only ws:// endpoints are supported",
                self.endpoint
            );
        }

        if !is_local_endpoint_url(&self.endpoint) {
            warn!(endpoint = %self.endpoint, "chat backend is not on this machine; traffic is unencrypted");
        }

        if self.stall_timeout.is_some_and(|timeout| timeout.is_zero()) {
            bail!("{STALL_TIMEOUT_ENV} must be greater than zero");
        }

        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
