// # HTTP IP Resolver
//
// This crate provides the HTTP-based public IP resolver for flare.
//
// ## Architecture
//
// One plain-text GET per call against an IP echo service. The response body
// is the caller's public IPv4 address, optionally followed by a newline.
//
// - ✅ Bounded request timeout (10 seconds)
// - ✅ Injectable HTTP client for tests and custom TLS setups
// - ❌ NO retry logic (the next reconcile tick is the retry)
// - ❌ NO caching (every tick must see the live address)

use async_trait::async_trait;
use flare_core::traits::IpResolver;
use flare_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default IP echo service
pub const DEFAULT_IP_SERVICE_URL: &str = "https://ip.shrt.day";

/// Default timeout for a single resolve request
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves the public IPv4 address by asking an HTTP echo service
///
/// Surrounding whitespace in the response body (such as a trailing newline)
/// is trimmed before parsing, so `"1.2.3.4\n"` is accepted.
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL returning the caller's IP as plain text
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a resolver for `url` with a client bounded by
    /// [`DEFAULT_RESOLVE_TIMEOUT`]
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built (for
    /// example when no TLS backend is available).
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_RESOLVE_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(url, client))
    }

    /// Create a resolver using a caller-supplied client
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// URL this resolver queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn fetch_public_ip(&self) -> Result<Ipv4Addr> {
        tracing::debug!("Fetching public IP from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(
                status.as_u16(),
                format!("IP service returned {}", status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        parse_ipv4(&body)
    }
}

/// Parse an IP echo response body into an IPv4 address
fn parse_ipv4(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();

    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(Error::parse(format!("Expected IPv4, got: {}", ip))),
        Err(_) => Err(Error::parse(format!("Invalid IP address: {:?}", text))),
    }
}
