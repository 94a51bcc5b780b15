//! Record reconciler
//!
//! The Reconciler is responsible for:
//! - Resolving the current public IP via an `IpResolver`
//! - Skipping provider calls while the IP matches the cached record
//! - Finding, creating or updating the record via a `DnsProvider`
//! - Caching the last record returned by a successful provider call
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ IpResolver  │─── Ipv4Addr ─────────┐
//! └─────────────┘                      │
//!                                      ▼
//!                             ┌──────────────┐
//!                             │  Reconciler  │── cached DnsRecord
//!                             └──────────────┘
//!                                      │
//!                   ┌──────────────────┴──────────────────┐
//!                   │                                     │
//!                   ▼                                     ▼
//!           ┌──────────────┐                      ┌─────────────┐
//!           │ DnsProvider  │                      │   Events    │
//!           │ find/create/ │                      │  (notify)   │
//!           │ update       │                      └─────────────┘
//!           └──────────────┘
//! ```
//!
//! ## State Machine
//!
//! | Observed state               | IP      | Action                 |
//! |------------------------------|---------|------------------------|
//! | `NoRecord`                   | any     | create                 |
//! | `Present { content, false }` | content | none (converged)       |
//! | `Present { content, true }`  | content | update (disable proxy) |
//! | `Present { other, _ }`       | new     | update                 |
//!
//! Without a cached record, the observed state comes from
//! `DnsProvider::find_record`. A lookup with zero or several matches both
//! land in `NoRecord`, so duplicates at the provider lead to yet another
//! record being created. Existing duplicates are never merged or deleted.
//!
//! ## Loop
//!
//! 1. Startup: resolve + `ensure`. Any error is returned to the caller.
//! 2. Every interval: resolve. A failed resolve skips the tick.
//! 3. An IP equal to the cached content skips the tick without provider calls.
//! 4. Otherwise `ensure`; a failure is logged and the cache kept as it was,
//!    except a 404 which drops the cache so the next tick looks it up again.

use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::traits::{DnsProvider, DnsRecord, IpResolver};
use std::net::Ipv4Addr;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Logical state of the managed record, as last observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    /// No usable record is known
    NoRecord,
    /// The record exists with this content and proxy flag
    Present {
        /// Record content (IP address)
        content: String,
        /// Provider proxy flag
        proxied: bool,
    },
}

/// Result of a single loop tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// IP resolution failed; nothing else happened
    ResolveFailed,
    /// IP matches the cached record; no provider call was made
    Unchanged,
    /// The record was checked and converged on the new IP
    Reconciled,
    /// The provider call failed; the cache keeps its previous value
    UpdateFailed,
}

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Loop started
    Started {
        record_name: String,
    },

    /// Record did not exist and was created
    RecordCreated {
        record_id: String,
        ip: Ipv4Addr,
    },

    /// Existing record was updated
    RecordUpdated {
        record_id: String,
        ip: Ipv4Addr,
    },

    /// Existing record already matched
    RecordUnchanged {
        record_id: String,
        ip: Ipv4Addr,
    },

    /// Resolved IP differs from the cached content
    IpChanged {
        previous: Option<String>,
        new_ip: Ipv4Addr,
    },

    /// IP resolution failed during a tick
    ResolveFailed {
        error: String,
    },

    /// Provider call failed during a tick
    UpdateFailed {
        ip: Ipv4Addr,
        error: String,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// Dynamic DNS reconciler for one A record
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Drive with [`Reconciler::run()`] until the shutdown signal fires,
///    or step manually with [`Reconciler::start()`] and [`Reconciler::tick()`]
///
/// ## Threading
///
/// All work happens on the caller's task. The cached record is only touched
/// through `&mut self`, so there is exactly one `ensure` in flight at a time.
pub struct Reconciler {
    /// Public IP lookup
    resolver: Box<dyn IpResolver>,

    /// Record API
    provider: Box<dyn DnsProvider>,

    /// Loop tunables
    config: ReconcileConfig,

    /// Last record returned by a successful provider call
    record: Option<DnsRecord>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `resolver`: IP resolver implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: Loop tunables
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconcile events
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
        config: ReconcileConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let reconciler = Self {
            resolver,
            provider,
            config,
            record: None,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// Current logical record state
    pub fn state(&self) -> RecordState {
        match &self.record {
            Some(record) => RecordState::Present {
                content: record.content.clone(),
                proxied: record.proxied,
            },
            None => RecordState::NoRecord,
        }
    }

    /// Last record returned by the provider, if any
    pub fn record(&self) -> Option<&DnsRecord> {
        self.record.as_ref()
    }

    /// Converge the managed record on `ip`
    ///
    /// Uses the cached record when there is one and falls back to a provider
    /// lookup otherwise. Issues at most one mutating call.
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: The record as the provider now holds it
    /// - `Err(Error)`: A provider call failed; the cache is left untouched
    pub async fn ensure(&mut self, ip: Ipv4Addr) -> Result<DnsRecord> {
        let name = &self.config.record_name;

        let observed = match &self.record {
            Some(record) => Some(record.clone()),
            None => {
                info!("Finding record {}...", name);
                self.provider.find_record().await?
            }
        };

        let record = match observed {
            None => {
                info!("Record {} not found, creating...", name);

                let mut draft = DnsRecord::draft(name.as_str(), self.config.ttl);
                draft.stamp(ip);

                let created = self.provider.create_record(&draft).await?;
                info!("Created record with ID {:?}", created.id);
                self.emit_event(ReconcileEvent::RecordCreated {
                    record_id: created.id.clone(),
                    ip,
                });
                created
            }
            Some(existing) if existing.is_converged(ip) => {
                info!("Record {} found, still up-to-date", name);
                self.emit_event(ReconcileEvent::RecordUnchanged {
                    record_id: existing.id.clone(),
                    ip,
                });
                existing
            }
            Some(mut existing) => {
                info!(
                    "Found record {} ({} proxied={}), updating...",
                    name, existing.content, existing.proxied
                );

                existing.stamp(ip);

                let updated = self.provider.update_record(&existing).await?;
                info!("Updated record with ID {:?}", updated.id);
                self.emit_event(ReconcileEvent::RecordUpdated {
                    record_id: updated.id.clone(),
                    ip,
                });
                updated
            }
        };

        self.record = Some(record.clone());
        Ok(record)
    }

    /// Resolve the IP once and converge the record on it
    ///
    /// Establishes the initial mapping. Every error is returned to the
    /// caller.
    pub async fn start(&mut self) -> Result<DnsRecord> {
        let ip = self.resolver.fetch_public_ip().await?;
        info!("Public IP is {}", ip);

        self.ensure(ip).await
    }

    /// Run one steady-state tick
    ///
    /// Never fails: errors are logged, emitted as events and reported
    /// through the returned [`TickOutcome`]. A provider 404 drops the cached
    /// record, so a record removed at the provider is found or recreated on
    /// the next tick.
    pub async fn tick(&mut self) -> TickOutcome {
        let ip = match self.resolver.fetch_public_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("Failed to fetch ip: {}", e);
                self.emit_event(ReconcileEvent::ResolveFailed {
                    error: e.to_string(),
                });
                return TickOutcome::ResolveFailed;
            }
        };

        let previous = self.record.as_ref().map(|record| record.content.clone());

        if previous.as_deref() == Some(ip.to_string().as_str()) {
            debug!("IP {} unchanged, skipping", ip);
            return TickOutcome::Unchanged;
        }

        info!(
            "IP changed from {:?} to {:?}",
            previous.as_deref().unwrap_or_default(),
            ip.to_string()
        );
        self.emit_event(ReconcileEvent::IpChanged {
            previous,
            new_ip: ip,
        });

        match self.ensure(ip).await {
            Ok(_) => TickOutcome::Reconciled,
            Err(e) => {
                warn!("Failed to update record: {}", e);

                // The cached id is gone at the provider; look it up again
                // on the next tick.
                if e.status() == Some(404) && self.record.take().is_some() {
                    info!(
                        "Record no longer exists at {}, forgetting it",
                        self.provider.provider_name()
                    );
                }

                self.emit_event(ReconcileEvent::UpdateFailed {
                    ip,
                    error: e.to_string(),
                });
                TickOutcome::UpdateFailed
            }
        }
    }

    /// Run the reconcile loop
    ///
    /// Performs [`Reconciler::start()`], then ticks every configured interval
    /// until `shutdown` fires or its sender is dropped. A tick already in
    /// progress always completes before shutdown is observed.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Startup reconciliation failed
    pub async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        self.emit_event(ReconcileEvent::Started {
            record_name: self.config.record_name.clone(),
        });

        self.start().await?;

        let period = self.config.interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = self.tick().await;
                    debug!("Tick finished: {:?}", outcome);
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(ReconcileEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

