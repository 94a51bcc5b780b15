// # flare-core
//
// Core library for the flare dynamic DNS reconciler.
//
// ## Architecture Overview
//
// This library keeps one A record at a DNS provider pointed at the caller's
// public IPv4 address:
// - **IpResolver**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for finding, creating and updating the record
// - **Reconciler**: Orchestrates resolve → find-or-create → update → cache
//   on a fixed interval
// - **Config**: Record identity and credentials loaded from `config.yml`
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP implementations
// 2. **Injected Dependencies**: Resolver and provider are passed in, never global
// 3. **Idempotency**: One provider call per actual change, none while converged
// 4. **Failure Isolation**: Startup errors are fatal, tick errors are logged

pub mod traits;
pub mod reconciler;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpResolver, DnsProvider, DnsRecord};
pub use reconciler::{Reconciler, ReconcileEvent, RecordState, TickOutcome};
pub use config::{Config, ReconcileConfig};
pub use error::{Error, Result};
