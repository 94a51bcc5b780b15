//! Core traits for the flare reconciler
//!
//! - [`IpResolver`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: Find, create and update the managed record

pub mod ip_resolver;
pub mod dns_provider;

pub use ip_resolver::IpResolver;
pub use dns_provider::{DnsProvider, DnsRecord, RECORD_TYPE_A};
