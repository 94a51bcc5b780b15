//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles record every call so tests can assert on exactly which
//! provider operations happened, and in what order.

#![allow(dead_code)]

use flare_core::error::{Error, Result};
use flare_core::traits::{DnsProvider, DnsRecord, IpResolver};
use flare_core::{ReconcileConfig, Reconciler, ReconcileEvent};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Record id assigned by [`MockDnsProvider`] on create
pub const CREATED_ID: &str = "abc123";

/// An IpResolver that replays a script of answers
///
/// `None` entries fail with a network error. Once the script is exhausted
/// the last answer repeats forever.
#[derive(Clone)]
pub struct ScriptedIpResolver {
    script: Arc<Mutex<VecDeque<Option<Ipv4Addr>>>>,
    last: Arc<Mutex<Option<Ipv4Addr>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpResolver {
    pub fn new(script: Vec<Option<Ipv4Addr>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A resolver that always answers `ip`
    pub fn fixed(ip: Ipv4Addr) -> Self {
        Self::new(vec![Some(ip)])
    }

    /// Queue another answer
    pub fn push(&self, answer: Option<Ipv4Addr>) {
        self.script.lock().unwrap().push_back(answer);
    }

    /// Get the number of times fetch_public_ip() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpResolver for ScriptedIpResolver {
    async fn fetch_public_ip(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let answer = match next {
            Some(answer) => {
                *self.last.lock().unwrap() = answer;
                answer
            }
            None => *self.last.lock().unwrap(),
        };

        answer.ok_or_else(|| Error::network("connection refused"))
    }
}

/// A provider call observed by [`MockDnsProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Find,
    Create(DnsRecord),
    Update(DnsRecord),
}

#[derive(Default)]
struct ProviderState {
    existing: Option<DnsRecord>,
    calls: Vec<ProviderCall>,
    fail_find: bool,
    fail_mutations: bool,
}

/// A DnsProvider backed by an in-memory record that logs every call
///
/// Clones share state, so a test can keep a handle after boxing one.
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockDnsProvider {
    /// A provider with no matching record
    pub fn empty() -> Self {
        Self::default()
    }

    /// A provider whose lookup returns `record`
    pub fn with_record(record: DnsRecord) -> Self {
        let provider = Self::default();
        provider.state.lock().unwrap().existing = Some(record);
        provider
    }

    /// Make find_record() fail with a network error
    pub fn fail_find(&self, fail: bool) {
        self.state.lock().unwrap().fail_find = fail;
    }

    /// Make create_record() and update_record() fail with HTTP 503
    pub fn fail_mutations(&self, fail: bool) {
        self.state.lock().unwrap().fail_mutations = fail;
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn creates(&self) -> Vec<DnsRecord> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Create(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<DnsRecord> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Update(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Remove the record at the provider, as an operator would by hand
    pub fn delete_record(&self) {
        self.state.lock().unwrap().existing = None;
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_record(&self) -> Result<Option<DnsRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::Find);

        if state.fail_find {
            return Err(Error::network("provider unreachable"));
        }
        Ok(state.existing.clone())
    }

    async fn create_record(&self, draft: &DnsRecord) -> Result<DnsRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::Create(draft.clone()));

        if state.fail_mutations {
            return Err(Error::http(503, "Cloudflare server error (transient)"));
        }

        let mut created = draft.clone();
        created.id = CREATED_ID.to_string();
        state.existing = Some(created.clone());
        Ok(created)
    }

    async fn update_record(&self, record: &DnsRecord) -> Result<DnsRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::Update(record.clone()));

        if state.fail_mutations {
            return Err(Error::http(503, "Cloudflare server error (transient)"));
        }

        let known = state.existing.as_ref().is_some_and(|existing| existing.id == record.id);
        if !known {
            return Err(Error::http(404, "Record update: not found"));
        }

        state.existing = Some(record.clone());
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A stored A record as the provider would return it
pub fn stored_record(id: &str, content: &str, proxied: bool) -> DnsRecord {
    let mut record = DnsRecord::draft("home.example.com", 60);
    record.id = id.to_string();
    record.content = content.to_string();
    record.proxied = proxied;
    record
}

/// Tunables for tests: real names, fast ticks
pub fn test_config() -> ReconcileConfig {
    ReconcileConfig::new("home.example.com").with_interval(Duration::from_millis(20))
}

/// Build a reconciler over the given doubles
pub fn build_reconciler(
    resolver: &ScriptedIpResolver,
    provider: &MockDnsProvider,
) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    Reconciler::new(
        Box::new(resolver.clone()),
        Box::new(provider.clone()),
        test_config(),
    )
    .expect("reconciler construction succeeds")
}

/// Drain every event currently buffered in `rx`
pub fn drain_events(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}
