// # IP Resolver Trait
//
// Defines the interface for discovering the caller's current public IPv4
// address.
//
// ## Implementations
//
// - HTTP plain-text service: `flare-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use flare_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> flare_core::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ip = resolver.fetch_public_ip().await?;
//     println!("public address: {}", ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP resolver implementations
///
/// Resolvers are **observers**: they report the address they see and
/// nothing else.
///
/// ## Allowed Capabilities
/// - ✅ One request to their lookup endpoint per call
/// - ✅ Validate and parse the response
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (the `Reconciler` waits for the next tick instead)
/// - ❌ Cache results between calls (the `Reconciler` owns last-known state)
/// - ❌ Spawn tasks
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Fetch the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The address reported by the lookup service
    /// - `Err(Error::Network)`: Transport failure
    /// - `Err(Error::Http)`: Non-success status
    /// - `Err(Error::Parse)`: Body is not a valid IPv4 literal
    async fn fetch_public_ip(&self) -> Result<Ipv4Addr, crate::Error>;
}
