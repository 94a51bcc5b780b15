// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `DnsProvider` for
// flare. One provider instance manages one A record in one zone.
//
// ## Implementation Status
//
// - ✅ One HTTP request per trait call
// - ✅ Full error propagation (the Reconciler decides what happens next)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error messages for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Provider `errors[]` messages carried into the returned error
// - ❌ NO retry logic (the next reconcile tick is the retry)
// - ❌ NO caching (the cached record is owned by the Reconciler)
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use flare_core::traits::{DnsProvider, DnsRecord, RECORD_TYPE_A};
use flare_core::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare response envelope
///
/// Every v4 endpoint wraps its payload as `{"result": ..., "errors": [...]}`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: Option<T>,

    #[serde(default)]
    errors: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,

    message: String,
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless and single-shot. Deciding whether a
/// call is needed at all is owned by the `Reconciler`.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Account the zone belongs to
    account_id: String,

    /// Zone holding the record
    zone_id: String,

    /// Fully qualified name of the managed record
    record_name: String,

    /// API base URL, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("zone_id", &self.zone_id)
            .field("record_name", &self.record_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `account_id`: Account the zone belongs to
    /// - `zone_id`: Zone holding the record
    /// - `record_name`: Fully qualified name of the managed A record
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token is empty or the HTTP client
    /// cannot be built.
    ///
    /// # Security
    ///
    /// The API token will NEVER be logged or displayed in error messages.
    pub fn new(
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(api_token, account_id, zone_id, record_name, client)
    }

    /// Create a provider using a caller-supplied HTTP client
    pub fn with_client(
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
        client: reqwest::Client,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        Ok(Self {
            api_token,
            account_id: account_id.into(),
            zone_id: zone_id.into(),
            record_name: record_name.into(),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Account the zone belongs to
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    /// Send a request and decode the `result` of the response envelope
    ///
    /// `action` names the operation in error messages.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::network(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let detail = describe_errors(&error_text);

            return Err(match status.as_u16() {
                401 | 403 => Error::http(
                    status.as_u16(),
                    format!(
                        "Authentication failed: Invalid API token or insufficient permissions - {}",
                        detail
                    ),
                ),
                404 => Error::http(404, format!("{}: not found - {}", action, detail)),
                409 => Error::http(
                    409,
                    format!("Conflict: Record is being updated by another process - {}", detail),
                ),
                429 => Error::http(
                    429,
                    format!("Rate limit exceeded. Please retry later - {}", detail),
                ),
                500..=599 => Error::http(
                    status.as_u16(),
                    format!("Cloudflare server error (transient) - {}", detail),
                ),
                other => Error::http(other, format!("{} failed - {}", action, detail)),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        let envelope: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| Error::decode(format!("{}: invalid response: {}", action, e)))?;

        envelope
            .result
            .ok_or_else(|| Error::decode(format!("{}: response has no result", action)))
    }
}

/// Summarize a failed response body, preferring Cloudflare's `errors[]`
fn describe_errors(body: &str) -> String {
    match serde_json::from_str::<ApiResponse<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope
            .errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up the managed A record by name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn find_record(&self) -> Result<Option<DnsRecord>> {
        tracing::debug!("Looking up record: {} (type: {})", self.record_name, RECORD_TYPE_A);

        let request = self
            .client
            .get(self.records_url())
            .query(&[("type", RECORD_TYPE_A), ("name", self.record_name.as_str())]);

        let mut records: Vec<DnsRecord> = self.send(request, "Record lookup").await?;

        match records.len() {
            1 => Ok(records.pop()),
            0 => Ok(None),
            n => {
                tracing::warn!(
                    "Found {} A records named {}, treating as no usable record",
                    n,
                    self.record_name
                );
                Ok(None)
            }
        }
    }

    /// Create a record
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"name": "...", "ttl": 60, "type": "A", "comment": "...", "content": "1.2.3.4", "proxied": false}
    /// ```
    async fn create_record(&self, draft: &DnsRecord) -> Result<DnsRecord> {
        tracing::debug!("Creating record: {} -> {}", draft.name, draft.content);

        let request = self.client.post(self.records_url()).json(draft);
        self.send(request, "Record creation").await
    }

    /// Overwrite a record by id
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn update_record(&self, record: &DnsRecord) -> Result<DnsRecord> {
        if record.id.is_empty() {
            return Err(Error::invalid_input("cannot update a record without an id"));
        }

        tracing::debug!("Updating record {}: {} -> {}", record.id, record.name, record.content);

        let url = format!("{}/{}", self.records_url(), record.id);
        let request = self.client.put(url).json(record);
        self.send(request, "Record update").await
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
