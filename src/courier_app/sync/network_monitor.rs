//! # Network Monitor
//!
//! Single source of truth for "can we reach the network".
//!
//! ## Features
//!
//! - **Connectivity Detection**: platform online/offline events via [`ConnectivityMonitor::report`]
//! - **Transition Listeners**: callbacks fire once per genuine transition
//! - **Reachability Probe**: [`ConnectivityMonitor::force_check`] catches a device that
//!   claims to be online while the backend is unreachable
//! - **Hysteresis**: the visible status only flips to offline after several failed probes
//!
//! The drain path asks [`ConnectivityMonitor::can_drain`], which also honours the
//! latest probe verdict; the UI shows [`ConnectivityMonitor::current_status`].

use crate::courier_app::api_client::ApiError;
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(self) -> bool {
        self == NetworkStatus::Online
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatus::Online => f.write_str("online"),
            NetworkStatus::Offline => f.write_str("offline"),
        }
    }
}

/// Lightweight reachability check against the backend
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> Result<(), ApiError>;
}

type Listener = Arc<dyn Fn(NetworkStatus) + Send + Sync>;

struct MonitorInner {
    status: watch::Sender<NetworkStatus>,
    /// Verdict of the last probe; reset by every platform "online" report
    reachable: AtomicBool,
    probe_failures: AtomicU32,
    failure_threshold: u32,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    probe: Option<Arc<dyn ConnectivityProbe>>,
}

impl MonitorInner {
    fn remove_listener(&self, id: u64) {
        let mut listeners = match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Shared connectivity state; clones observe the same signal
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<MonitorInner>,
}

impl fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("status", &self.current_status())
            .field("reachable", &self.inner.reachable.load(Ordering::SeqCst))
            .finish()
    }
}

impl ConnectivityMonitor {
    /// Start from the platform's current network signal
    pub fn new(initial: NetworkStatus) -> Self {
        Self::build(initial, None, 1)
    }

    /// Monitor that can verify reachability with `probe`
    pub fn with_probe(
        initial: NetworkStatus,
        probe: Arc<dyn ConnectivityProbe>,
        failure_threshold: u32,
    ) -> Self {
        Self::build(initial, Some(probe), failure_threshold.max(1))
    }

    fn build(
        initial: NetworkStatus,
        probe: Option<Arc<dyn ConnectivityProbe>>,
        failure_threshold: u32,
    ) -> Self {
        let (status, _) = watch::channel(initial);
        Self {
            inner: Arc::new(MonitorInner {
                status,
                reachable: AtomicBool::new(true),
                probe_failures: AtomicU32::new(0),
                failure_threshold,
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                probe,
            }),
        }
    }

    /// UI-visible connectivity
    pub fn current_status(&self) -> NetworkStatus {
        *self.inner.status.borrow()
    }

    /// Online and not contradicted by the last probe
    pub fn can_drain(&self) -> bool {
        self.current_status().is_online() && self.inner.reachable.load(Ordering::SeqCst)
    }

    /// Feed a platform network event
    pub fn report(&self, status: NetworkStatus) {
        if status.is_online() {
            self.inner.reachable.store(true, Ordering::SeqCst);
            self.inner.probe_failures.store(0, Ordering::SeqCst);
        }
        self.transition(status);
    }

    fn transition(&self, status: NetworkStatus) {
        let changed = self.inner.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if !changed {
            return;
        }

        tracing::info!("[Network] connectivity changed to {}", status);
        let listeners: Vec<Listener> = {
            let listeners = match self.inner.listeners.lock() {
                Ok(listeners) => listeners,
                Err(poisoned) => poisoned.into_inner(),
            };
            listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
        };
        for listener in listeners {
            listener(status);
        }
    }

    /// Register a transition listener. Dropping the handle unsubscribes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(NetworkStatus) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let mut listeners = match self.inner.listeners.lock() {
            Ok(listeners) => listeners,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            monitor: Arc::downgrade(&self.inner),
        }
    }

    /// Receiver for async consumers; sees the same transitions as listeners
    pub fn watch(&self) -> watch::Receiver<NetworkStatus> {
        self.inner.status.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        match self.inner.listeners.lock() {
            Ok(listeners) => listeners.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Best-effort reachability probe.
    ///
    /// Returns the status the queue should act on. Probe errors are never
    /// propagated; they only count towards the offline threshold.
    pub async fn force_check(&self) -> NetworkStatus {
        let Some(probe) = self.inner.probe.clone() else {
            return self.current_status();
        };

        match probe.probe().await {
            Ok(()) => {
                self.inner.reachable.store(true, Ordering::SeqCst);
                self.inner.probe_failures.store(0, Ordering::SeqCst);
                self.transition(NetworkStatus::Online);
                NetworkStatus::Online
            }
            Err(e) => {
                self.inner.reachable.store(false, Ordering::SeqCst);
                let failures = self.inner.probe_failures.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!("[Network] probe failed ({} in a row): {}", failures, e);
                if failures >= self.inner.failure_threshold {
                    self.transition(NetworkStatus::Offline);
                }
                NetworkStatus::Offline
            }
        }
    }
}

/// Handle returned by [`ConnectivityMonitor::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    monitor: Weak<MonitorInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.remove_listener(self.id);
        }
    }
}
