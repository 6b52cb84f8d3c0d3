//! Internet reachability monitor.
//!
//! A dedicated thread runs a single-threaded tokio runtime that probes a
//! fixed host every few seconds. Only state *changes* are reported, so the
//! UI is not re-poked on every successful probe.

use std::future::Future;
use std::thread;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::config;
use crate::error::{IoResultExt, WelcomeResult};
use crate::events::{EventSink, UiEvent};

/// Edge reported to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    /// Connected -> disconnected
    Lost,
    /// Disconnected -> connected, once per outage
    Restored,
}

/// Tracks the last observed state and turns probe results into edges.
/// Starts out assuming the link is up, matching the initial UI.
#[derive(Debug, Clone, Copy)]
pub struct LinkTracker {
    connected: bool,
}

impl Default for LinkTracker {
    fn default() -> Self {
        Self { connected: true }
    }
}

impl LinkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, reachable: bool) -> Option<LinkChange> {
        let change = match (self.connected, reachable) {
            (true, false) => Some(LinkChange::Lost),
            (false, true) => Some(LinkChange::Restored),
            _ => None,
        };
        self.connected = reachable;
        change
    }
}

/// Something that can tell whether the network is up
pub trait Probe {
    fn is_reachable(&self) -> impl Future<Output = bool>;
}

/// Plain TCP connect to `host:port` with a timeout
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(
            config::network::PROBE_HOST,
            config::network::PROBE_PORT,
            Duration::from_secs(config::network::PROBE_TIMEOUT_SECS),
        )
    }
}

impl Probe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        // name resolution counts against the same timeout
        let attempt = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!("probe {}:{} failed: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                tracing::debug!("probe {}:{} timed out", self.host, self.port);
                false
            }
        }
    }
}

/// Probe forever, emitting a [`UiEvent::Link`] for every edge.
pub async fn watch<P: Probe>(probe: P, period: Duration, sink: &dyn EventSink) {
    let mut tracker = LinkTracker::new();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let reachable = probe.is_reachable().await;
        if let Some(change) = tracker.observe(reachable) {
            match change {
                LinkChange::Lost => tracing::warn!("Internet connection lost"),
                LinkChange::Restored => tracing::info!("Internet connection restored"),
            }
            sink.emit(UiEvent::Link(change));
        }
    }
}

/// Start the monitor thread. It runs until the process exits.
pub fn spawn_monitor<S>(sink: S) -> WelcomeResult<()>
where
    S: EventSink + 'static,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .with_context("building connectivity runtime")?;
    thread::Builder::new()
        .name("connectivity".into())
        .spawn(move || {
            runtime.block_on(watch(
                TcpProbe::default(),
                Duration::from_secs(config::network::PROBE_PERIOD_SECS),
                &sink,
            ))
        })
        .with_context("spawning connectivity thread")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[test]
    fn restored_fires_once_per_outage() {
        let mut tracker = LinkTracker::new();
        let seen: Vec<_> = [false, false, true, true, true]
            .into_iter()
            .filter_map(|r| tracker.observe(r))
            .collect();
        assert_eq!(seen, vec![LinkChange::Lost, LinkChange::Restored]);
    }

    #[test]
    fn each_outage_gets_its_own_restore() {
        let mut tracker = LinkTracker::new();
        let seen: Vec<_> = [false, true, false, true]
            .into_iter()
            .filter_map(|r| tracker.observe(r))
            .collect();
        assert_eq!(
            seen,
            vec![LinkChange::Lost, LinkChange::Restored, LinkChange::Lost, LinkChange::Restored]
        );
    }

    #[test]
    fn steady_connection_is_silent() {
        let mut tracker = LinkTracker::new();
        assert!((0..5).all(|_| tracker.observe(true).is_none()));
        assert!(tracker.connected);
    }

    #[tokio::test]
    async fn tcp_probe_reaches_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn tcp_probe_fails_on_closed_port() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(!probe.is_reachable().await);
    }

    struct Scripted(RefCell<VecDeque<bool>>);

    impl Probe for Scripted {
        async fn is_reachable(&self) -> bool {
            self.0.borrow_mut().pop_front().unwrap_or(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn watch_emits_only_edges() {
        let sink = crate::events::RecordingSink::new();
        let probe = Scripted(RefCell::new(VecDeque::from([true, false, false, true, true])));
        let _ = tokio::time::timeout(
            Duration::from_secs(20),
            watch(probe, Duration::from_secs(3), &sink),
        )
        .await;
        assert_eq!(
            sink.events(),
            vec![
                UiEvent::Link(LinkChange::Lost),
                UiEvent::Link(LinkChange::Restored)
            ]
        );
    }
}
