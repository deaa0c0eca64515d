//! VirusTotal v2 scan provider.
//!
//! Public API keys are rate limited per minute and per day. HTTP 204 is how
//! the service signals an exceeded quota; it and transport failures surface
//! as `ProviderUnavailable` so the orchestrator records an `error` verdict.

use crate::clock::{Clock, SystemClock};
use crate::config::VirusTotalConfig;
use crate::error::{VaultError, VaultResult};
use crate::scan_provider::{EngineResult, ProviderReport, ScanHandle, ScanProvider};
use crate::types::ResourceKind;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Requests spent against the daily quota, per UTC day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsage {
    pub daily_limit: u32,
    pub used: u32,
    pub remaining: u32,
}

#[derive(Deserialize)]
struct ReportResponse {
    response_code: i32,
    #[serde(default)]
    scan_id: Option<String>,
    #[serde(default)]
    positives: u32,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    scans: BTreeMap<String, EngineResult>,
    #[serde(default)]
    permalink: Option<String>,
}

#[derive(Deserialize)]
struct SubmitResponse {
    response_code: i32,
    #[serde(default)]
    scan_id: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    verbose_msg: Option<String>,
}

pub struct VirusTotalClient {
    client: Client,
    config: VirusTotalConfig,
    clock: Arc<dyn Clock>,
    usage: Mutex<(NaiveDate, u32)>,
}

impl VirusTotalClient {
    pub fn new(config: VirusTotalConfig) -> VaultResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: VirusTotalConfig, clock: Arc<dyn Clock>) -> VaultResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let today = clock.now().date_naive();

        Ok(Self {
            client,
            config,
            clock,
            usage: Mutex::new((today, 0)),
        })
    }

    /// Current quota usage. Resets at UTC midnight.
    pub fn usage(&self) -> ApiUsage {
        let today = self.clock.now().date_naive();
        let mut usage = self.usage.lock().unwrap_or_else(|e| e.into_inner());
        if usage.0 != today {
            *usage = (today, 0);
        }
        ApiUsage {
            daily_limit: self.config.daily_request_limit,
            used: usage.1,
            remaining: self.config.daily_request_limit.saturating_sub(usage.1),
        }
    }

    /// Counts one request against today's quota, or refuses if it is spent.
    fn reserve_request(&self) -> VaultResult<()> {
        let today = self.clock.now().date_naive();
        let mut usage = self.usage.lock().unwrap_or_else(|e| e.into_inner());
        if usage.0 != today {
            *usage = (today, 0);
        }
        if usage.1 >= self.config.daily_request_limit {
            warn!("VirusTotal daily request limit reached");
            return Err(VaultError::ProviderUnavailable(
                "daily request limit reached".to_string(),
            ));
        }
        usage.1 += 1;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn get_report(&self, path: &str, resource: &str) -> VaultResult<Option<ProviderReport>> {
        self.reserve_request()?;

        let resp = self
            .client
            .get(self.endpoint(path))
            .query(&[("apikey", self.config.api_key.as_str()), ("resource", resource)])
            .send()
            .await
            .map_err(unavailable)?;

        let report: ReportResponse = read_json(resp).await?;
        if report.response_code != 1 {
            debug!("no {path} for {resource} (response_code {})", report.response_code);
            return Ok(None);
        }

        Ok(Some(ProviderReport {
            scan_id: report.scan_id,
            positives: report.positives,
            total: report.total,
            scans: report.scans,
            permalink: report.permalink,
        }))
    }

    async fn post_form(&self, path: &str, field: &str, value: &str) -> VaultResult<ScanHandle> {
        self.reserve_request()?;

        let resp = self
            .client
            .post(self.endpoint(path))
            .form(&[("apikey", self.config.api_key.as_str()), (field, value)])
            .send()
            .await
            .map_err(unavailable)?;

        accepted(path, read_json(resp).await?)
    }
}

#[async_trait]
impl ScanProvider for VirusTotalClient {
    async fn file_report(&self, resource: &str) -> VaultResult<Option<ProviderReport>> {
        self.get_report("file/report", resource).await
    }

    async fn submit_file(&self, file_name: &str, payload: &[u8]) -> VaultResult<ScanHandle> {
        self.reserve_request()?;

        let part = Part::bytes(payload.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(unavailable)?;
        let form = Form::new()
            .text("apikey", self.config.api_key.clone())
            .part("file", part);

        let resp = self
            .client
            .post(self.endpoint("file/scan"))
            .multipart(form)
            .send()
            .await
            .map_err(unavailable)?;

        let handle = accepted("file/scan", read_json(resp).await?)?;
        debug!("submitted {file_name} ({} bytes) for scanning", payload.len());
        Ok(handle)
    }

    async fn url_report(&self, resource: &str) -> VaultResult<Option<ProviderReport>> {
        self.get_report("url/report", resource).await
    }

    async fn submit_url(&self, url: &str) -> VaultResult<ScanHandle> {
        self.post_form("url/scan", "url", url).await
    }

    async fn rescan(&self, kind: ResourceKind, resource: &str) -> VaultResult<ScanHandle> {
        match kind {
            ResourceKind::File => self.post_form("file/rescan", "resource", resource).await,
            // v2 has no URL rescan endpoint; a fresh url/scan forces one.
            ResourceKind::Link => self.post_form("url/scan", "url", resource).await,
        }
    }
}

fn unavailable(e: reqwest::Error) -> VaultError {
    VaultError::ProviderUnavailable(e.to_string())
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> VaultResult<T> {
    if resp.status() == StatusCode::NO_CONTENT {
        return Err(VaultError::ProviderUnavailable(
            "rate limit exceeded (HTTP 204)".to_string(),
        ));
    }
    resp.error_for_status()
        .map_err(unavailable)?
        .json()
        .await
        .map_err(|e| VaultError::ProviderUnavailable(format!("malformed response: {e}")))
}

fn accepted(path: &str, resp: SubmitResponse) -> VaultResult<ScanHandle> {
    if resp.response_code != 1 {
        let msg = resp.verbose_msg.unwrap_or_else(|| "submission rejected".to_string());
        return Err(VaultError::ProviderUnavailable(format!("{path}: {msg}")));
    }
    let scan_id = resp
        .scan_id
        .ok_or_else(|| VaultError::ProviderUnavailable(format!("{path}: missing scan_id")))?;
    Ok(ScanHandle {
        scan_id,
        permalink: resp.permalink,
    })
}
