//! HTTP-backed collaborators.
//!
//! Wire shapes are plain JSON. Byte payloads travel as JSON arrays of
//! numbers, the serde default for `Vec<u8>`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sentinel::{
    ActionKind, CollaboratorError, CycleFinalizer, Encryptor, Enforcer, Report, ReportSource,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Shared client for every collaborator of every monitor. Per-call deadlines
/// are enforced by the engine, so only the connect phase is bounded here.
pub fn build_client(connect_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().connect_timeout(connect_timeout).build()
}

#[derive(Debug, Serialize)]
struct EncryptRequest<'a> {
    plaintext: &'a [u8],
}

#[derive(Debug, Deserialize)]
struct EncryptResponse {
    ciphertext: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct EnforceRequest<'a> {
    entity_key: &'a str,
    payload: &'a [u8],
}

#[derive(Debug, Deserialize)]
struct EnforceResponse {
    accepted: bool,
}

#[derive(Debug, Serialize)]
struct FinalizeRequest {
    cycle: u64,
}

#[derive(Debug, Deserialize)]
struct FinalizeResponse {
    finalized: bool,
}

/// Enforcement URL for one action: `{base}/{action}`.
pub fn action_url(base: &str, action: ActionKind) -> String {
    format!("{}/{}", base.trim_end_matches('/'), action.as_str())
}

async fn post_json<Req, Resp>(client: &Client, url: &str, body: &Req) -> Result<Resp, String>
where
    Req: Serialize + ?Sized,
    Resp: for<'de> Deserialize<'de>,
{
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| format!("POST {}: {}", url, e))?;
    if !resp.status().is_success() {
        return Err(format!("POST {}: non-success status {}", url, resp.status()));
    }
    resp.json::<Resp>()
        .await
        .map_err(|e| format!("POST {}: bad response body: {}", url, e))
}

#[derive(Debug, Clone)]
pub struct HttpReportSource {
    client: Client,
    url: String,
}

impl HttpReportSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReportSource for HttpReportSource {
    async fn fetch_reports(&self) -> Result<Vec<Report>, CollaboratorError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CollaboratorError::new(format!("GET {}: {}", self.url, e)))?;
        if !resp.status().is_success() {
            return Err(CollaboratorError::new(format!(
                "GET {}: non-success status {}",
                self.url,
                resp.status()
            )));
        }
        let reports: Vec<Report> = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::new(format!("GET {}: bad report list: {}", self.url, e)))?;
        debug!(url = %self.url, count = reports.len(), "Fetched reports");
        Ok(reports)
    }
}

#[derive(Debug, Clone)]
pub struct HttpEncryptor {
    client: Client,
    url: String,
}

impl HttpEncryptor {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Encryptor for HttpEncryptor {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CollaboratorError> {
        let resp: EncryptResponse =
            post_json(&self.client, &self.url, &EncryptRequest { plaintext }).await?;
        Ok(resp.ciphertext)
    }
}

/// Any transport or decoding error counts as a rejection.
#[derive(Debug, Clone)]
pub struct HttpEnforcer {
    client: Client,
    base_url: String,
}

impl HttpEnforcer {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Enforcer for HttpEnforcer {
    async fn enforce(&self, action: ActionKind, entity_key: &str, payload: &[u8]) -> bool {
        let url = action_url(&self.base_url, action);
        let body = EnforceRequest {
            entity_key,
            payload,
        };
        match post_json::<_, EnforceResponse>(&self.client, &url, &body).await {
            Ok(resp) => resp.accepted,
            Err(e) => {
                warn!(entity = entity_key, action = %action, "Enforcement call failed: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFinalizer {
    client: Client,
    url: String,
}

impl HttpFinalizer {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CycleFinalizer for HttpFinalizer {
    async fn finalize_cycle(&self, cycle: u64) -> bool {
        match post_json::<_, FinalizeResponse>(&self.client, &self.url, &FinalizeRequest { cycle })
            .await
        {
            Ok(resp) => resp.finalized,
            Err(e) => {
                warn!(cycle, "Finalize call failed: {}", e);
                false
            }
        }
    }
}
