//! Connectivity Observer.
//!
//! [`Connectivity`] holds the live reachability signal. It can be driven by a
//! host platform (via [`Connectivity::set_online`]) or by a
//! [`ConnectivityProbe`] that periodically opens a TCP connection to the
//! remote host.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::constants::PROBE_CONNECT_TIMEOUT_MS;

/// Cloneable handle over the reachability signal.
#[derive(Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx: Arc::new(tx) }
    }

    /// Live reachability stream.
    pub fn observe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Point-in-time read used for gating decisions.
    pub fn is_connected_now(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record the current reachability; observers are only woken on a change.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }
}

/// Periodically checks that the remote host accepts TCP connections.
pub struct ConnectivityProbe {
    connectivity: Connectivity,
    address: String,
    interval: Duration,
    connect_timeout: Duration,
    cancel: CancellationToken,
}

impl ConnectivityProbe {
    /// Build a probe for the host and port of `base_url`.
    pub fn new(
        connectivity: Connectivity,
        base_url: &str,
        interval: Duration,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(base_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("base_url '{}' has no host", base_url))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow::anyhow!("base_url '{}' has no port", base_url))?;

        Ok(Self {
            connectivity,
            address: format!("{host}:{port}"),
            interval,
            connect_timeout: Duration::from_millis(PROBE_CONNECT_TIMEOUT_MS),
            cancel,
        })
    }

    /// Run until the cancellation token fires. Probes once immediately.
    pub async fn run(self) {
        info!("Connectivity probe started for {}", self.address);

        loop {
            let online = self.probe_once().await;
            self.connectivity.set_online(online);

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Connectivity probe cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    async fn probe_once(&self) -> bool {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Probe to {} failed: {}", self.address, e);
                false
            }
            Err(_) => {
                warn!("Probe to {} timed out", self.address);
                false
            }
        }
    }
}
