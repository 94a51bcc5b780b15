// # DNS Provider Trait
//
// Defines the interface for reading and writing the single managed A record
// at a DNS provider, plus the record model exchanged over it.
//
// ## Implementations
//
// - Cloudflare: `flare-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use flare_core::{DnsProvider, DnsRecord};
//
// #[tokio::main]
// async fn main() -> flare_core::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let record = match provider.find_record().await? {
//         Some(record) => record,
//         None => {
//             let mut draft = DnsRecord::draft("home.example.com", 60);
//             draft.stamp("1.2.3.4".parse().unwrap());
//             provider.create_record(&draft).await?
//         }
//     };
//     println!("record {} -> {}", record.id, record.content);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Record type managed by flare
pub const RECORD_TYPE_A: &str = "A";

/// A DNS record as exchanged with the provider
///
/// Before creation `id` is empty and is left out of request bodies; once
/// created, the provider-assigned `id` identifies the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned identifier (empty until created)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Fully qualified record name
    pub name: String,

    /// Time-to-live in seconds
    pub ttl: u32,

    /// Record type ("A")
    #[serde(rename = "type")]
    pub record_type: String,

    /// Free-form comment, null when the provider has none
    #[serde(default)]
    pub comment: Option<String>,

    /// Record content (the IP address)
    pub content: String,

    /// Whether the provider proxies traffic for this record
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// Create an unsaved A record draft with empty content
    pub fn draft(name: impl Into<String>, ttl: u32) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            ttl,
            record_type: RECORD_TYPE_A.to_string(),
            comment: None,
            content: String::new(),
            proxied: false,
        }
    }

    /// Point the record at `ip` and stamp the current local time
    pub fn stamp(&mut self, ip: Ipv4Addr) {
        self.stamp_at(ip, Local::now().fixed_offset());
    }

    /// Point the record at `ip`, stamping the comment with `at`
    ///
    /// Proxying is always switched off.
    pub fn stamp_at(&mut self, ip: Ipv4Addr, at: DateTime<FixedOffset>) {
        self.comment = Some(format!(
            "Last updated: {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, false)
        ));
        self.content = ip.to_string();
        self.proxied = false;
    }

    /// Whether the record already points at `ip` with proxying disabled
    pub fn is_converged(&self, ip: Ipv4Addr) -> bool {
        self.content == ip.to_string() && !self.proxied
    }
}

/// Trait for DNS provider implementations
///
/// A provider instance is scoped to one (zone, record name, type A) triple
/// fixed at construction.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the `Reconciler` decides what happens next)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff
/// - ❌ Cache records between calls (owned by `Reconciler`)
/// - ❌ Decide whether an update is needed (owned by `Reconciler`)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the managed record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(DnsRecord))`: Exactly one matching record exists
    /// - `Ok(None)`: Zero matches, or more than one. Both mean "no usable
    ///   record" and lead the caller to create one.
    /// - `Err(Error)`: The lookup failed
    async fn find_record(&self) -> Result<Option<DnsRecord>, crate::Error>;

    /// Create a new record from `draft`
    ///
    /// # Returns
    ///
    /// The record as stored by the provider, including its assigned id.
    async fn create_record(&self, draft: &DnsRecord) -> Result<DnsRecord, crate::Error>;

    /// Replace the record identified by `record.id`
    ///
    /// # Returns
    ///
    /// The record as stored by the provider after the update.
    async fn update_record(&self, record: &DnsRecord) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
