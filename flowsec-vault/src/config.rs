//! Vault configuration.

use crate::error::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Top-level configuration for the vault core and its adapters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultConfig {
    pub scan: ScanConfig,
    pub virustotal: VirusTotalConfig,

    /// Base URL of the key directory service (e.g., "https://api.flowsec.app").
    pub key_directory_url: String,

    /// Ciphertext storage; `None` keeps objects in memory.
    pub s3: Option<S3Config>,
}

/// Scan pipeline tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// How long a cached verdict stays valid (seconds).
    pub cache_retention_secs: i64,

    /// Delay between provider report polls for an in-flight scan (milliseconds).
    pub poll_interval_ms: u64,

    /// Polls before an in-flight scan is surfaced as still scanning.
    pub max_poll_attempts: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cache_retention_secs: 24 * 60 * 60,
            // Public VirusTotal keys allow 4 requests/minute.
            poll_interval_ms: 15_000,
            max_poll_attempts: 20,
        }
    }
}

impl ScanConfig {
    /// Checks that the retention window is positive and representable.
    pub fn validate(&self) -> VaultResult<()> {
        let secs = self.cache_retention_secs;
        if secs <= 0 || chrono::Duration::try_seconds(secs).is_none() {
            return Err(VaultError::Config(format!(
                "cache_retention_secs must be a positive number of seconds, got {secs}"
            )));
        }
        Ok(())
    }

    /// Retention window as a duration. Saturates instead of overflowing.
    pub fn cache_retention(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.cache_retention_secs).unwrap_or(chrono::Duration::MAX)
    }
}

/// VirusTotal v2 API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VirusTotalConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
    pub daily_request_limit: u32,
}

impl Default for VirusTotalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.virustotal.com/vtapi/v2".to_string(),
            api_key: String::new(),
            request_timeout_secs: 30,
            daily_request_limit: 1000,
        }
    }
}

/// S3 (or MinIO) bucket holding ciphertext blobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,

    /// Optional endpoint override (for MinIO in testing).
    pub endpoint_override: Option<String>,

    pub access_key_id: String,
    pub secret_access_key: String,

    /// Key prefix for stored objects.
    pub prefix: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            virustotal: VirusTotalConfig::default(),
            key_directory_url: "https://api.flowsec.app".to_string(),
            s3: None,
        }
    }
}

impl VaultConfig {
    /// Builds a config from the process environment.
    pub fn from_env() -> VaultResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults overridden by `lookup`.
    ///
    /// Recognized keys: `VIRUSTOTAL_API_KEY`, `VIRUSTOTAL_BASE_URL`,
    /// `FLOWSEC_KEY_DIRECTORY_URL`, `FLOWSEC_CACHE_RETENTION_SECS`,
    /// `FLOWSEC_POLL_INTERVAL_MS`, `FLOWSEC_MAX_POLL_ATTEMPTS`.
    pub fn from_lookup<F>(lookup: F) -> VaultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("VIRUSTOTAL_API_KEY") {
            config.virustotal.api_key = key;
        }
        if let Some(url) = lookup("VIRUSTOTAL_BASE_URL") {
            config.virustotal.base_url = url;
        }
        if let Some(url) = lookup("FLOWSEC_KEY_DIRECTORY_URL") {
            config.key_directory_url = url;
        }
        if let Some(v) = lookup("FLOWSEC_CACHE_RETENTION_SECS") {
            config.scan.cache_retention_secs = parse_var("FLOWSEC_CACHE_RETENTION_SECS", &v)?;
        }
        if let Some(v) = lookup("FLOWSEC_POLL_INTERVAL_MS") {
            config.scan.poll_interval_ms = parse_var("FLOWSEC_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("FLOWSEC_MAX_POLL_ATTEMPTS") {
            config.scan.max_poll_attempts = parse_var("FLOWSEC_MAX_POLL_ATTEMPTS", &v)?;
        }

        config.scan.validate()?;
        Ok(config)
    }

    /// Creates a config for tests: short polls, no network defaults.
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            scan: ScanConfig {
                cache_retention_secs: 60,
                poll_interval_ms: 1,
                max_poll_attempts: 3,
            },
            virustotal: VirusTotalConfig {
                base_url: "http://localhost:8089".to_string(),
                api_key: "test-key".to_string(),
                request_timeout_secs: 5,
                daily_request_limit: 10,
            },
            key_directory_url: "http://localhost:3002".to_string(),
            s3: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> VaultResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| VaultError::Config(format!("{name} has invalid value {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_polls_quickly() {
        let config = VaultConfig::test();
        assert_eq!(config.scan.poll_interval_ms, 1);
        assert!(config.s3.is_none());
    }

    #[test]
    fn huge_retention_saturates() {
        let scan = ScanConfig {
            cache_retention_secs: i64::MAX,
            ..ScanConfig::default()
        };
        assert!(scan.validate().is_err());
        assert_eq!(scan.cache_retention(), chrono::Duration::MAX);
    }
}
