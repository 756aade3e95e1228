// Tallystick - A nil-safe Statsd client for Rust!
//
// Copyright 2015-2021 Nick Pillitteri
// Copyright 2026 The Tallystick Authors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, warn};

use crate::sinks::core::{MetricSink, SinkStats, SocketStats};
use crate::types::{ErrorKind, MetricError, MetricResult};

/// Shortest interval between lookups of a resolving sink's destination.
const MIN_RESOLVE_INTERVAL: Duration = Duration::from_millis(100);

/// Attempt to convert anything implementing the `ToSocketAddrs` trait
/// into a concrete `SocketAddr` instance, returning an `InvalidConfig`
/// error if the address could not be parsed or resolved.
#[allow(clippy::needless_pass_by_value)]
fn get_addr<A: ToSocketAddrs>(addr: A) -> MetricResult<SocketAddr> {
    let mut addrs = addr
        .to_socket_addrs()
        .map_err(|e| MetricError::config("Unable to resolve statsd address", e))?;

    match addrs.next() {
        Some(addr) => Ok(addr),
        None => Err(MetricError::from((
            ErrorKind::InvalidConfig,
            "No socket addresses yielded",
        ))),
    }
}

/// Bind an ephemeral, non-blocking local socket able to reach `addr`.
fn bind_for(addr: &SocketAddr) -> MetricResult<UdpSocket> {
    let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(local).map_err(|e| MetricError::config("Unable to bind local socket", e))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| MetricError::config("Unable to configure local socket", e))?;
    Ok(socket)
}

/// Cached destination of a resolving sink.
///
/// Lookups only happen in `refresh`, which is called from a background
/// thread. Senders just read the last good address. Addresses of a family
/// other than the one the local socket was bound for are never accepted.
#[derive(Debug)]
struct Resolver {
    host: String,
    addr: RwLock<SocketAddr>,
}

impl Resolver {
    fn new(host: &str, addr: SocketAddr) -> Self {
        Resolver {
            host: host.to_owned(),
            addr: RwLock::new(addr),
        }
    }

    fn current(&self) -> SocketAddr {
        *self.addr.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look the host up again, keeping the current address when the lookup
    /// fails or yields an address the socket cannot send to.
    fn refresh(&self) {
        let current = self.current();

        match get_addr(self.host.as_str()) {
            Ok(addr) if addr == current => {}
            Ok(addr) if addr.is_ipv4() != current.is_ipv4() => {
                warn!("statsd address for {} moved to {} of another family, keeping {}", self.host, addr, current);
            }
            Ok(addr) => {
                debug!("statsd address for {} changed from {} to {}", self.host, current, addr);
                *self.addr.write().unwrap_or_else(PoisonError::into_inner) = addr;
            }
            Err(e) => warn!("unable to re-resolve statsd address {}, keeping {}: {}", self.host, current, e),
        }
    }
}

/// Refresh `resolver` once per `interval` in a new thread until the returned
/// sender is dropped.
fn spawn_refresher(resolver: Arc<Resolver>, interval: Duration) -> io::Result<(Sender<()>, JoinHandle<()>)> {
    let (done_tx, done_rx) = bounded::<()>(0);
    let ticker = tick(interval.max(MIN_RESOLVE_INTERVAL));

    let handle = thread::Builder::new()
        .name("tallystick-resolver".to_owned())
        .spawn(move || loop {
            select! {
                recv(ticker) -> _ => resolver.refresh(),
                recv(done_rx) -> _ => break,
            }
        })?;

    Ok((done_tx, handle))
}

/// Implementation of a `MetricSink` that emits metrics over UDP.
///
/// Each packet is sent to the Statsd server as a single datagram when the
/// `.emit()` method is called, in the thread of the caller. Nothing is
/// buffered and nothing is retried. The socket is closed when the sink is
/// dropped.
#[derive(Debug)]
pub struct UdpMetricSink {
    addr: SocketAddr,
    socket: UdpSocket,
    stats: SocketStats,
    resolver: Option<Arc<Resolver>>,
    // dropping this stops the background lookups
    _refresher: Option<Sender<()>>,
}

impl UdpMetricSink {
    /// Construct a new `UdpMetricSink` instance, binding a local socket.
    ///
    /// The destination is resolved once and an ephemeral, non-blocking local
    /// socket of the same address family is bound to send from.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tallystick::{UdpMetricSink, DEFAULT_PORT};
    ///
    /// let sink = UdpMetricSink::open(("metrics.example.com", DEFAULT_PORT));
    /// ```
    ///
    /// # Failures
    ///
    /// This method may fail if:
    ///
    /// * It is unable to resolve the hostname of the metric server.
    /// * The host address is otherwise unable to be parsed
    /// * A local socket cannot be bound
    pub fn open<A>(to_addr: A) -> MetricResult<UdpMetricSink>
    where
        A: ToSocketAddrs,
    {
        let addr = get_addr(to_addr)?;
        let socket = bind_for(&addr)?;
        Self::from(addr, socket)
    }

    /// Construct a new `UdpMetricSink` instance from an existing socket.
    ///
    /// The socket should already be bound to a local address with any desired
    /// configuration applied (blocking vs non-blocking, timeouts, etc.).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::net::UdpSocket;
    /// use tallystick::{UdpMetricSink, DEFAULT_PORT};
    ///
    /// let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
    /// socket.set_nonblocking(true).unwrap();
    /// let host = ("metrics.example.com", DEFAULT_PORT);
    /// let sink = UdpMetricSink::from(host, socket);
    /// ```
    ///
    /// # Failures
    ///
    /// This method may fail if:
    ///
    /// * It is unable to resolve the hostname of the metric server.
    /// * The host address is otherwise unable to be parsed
    pub fn from<A>(to_addr: A, socket: UdpSocket) -> MetricResult<UdpMetricSink>
    where
        A: ToSocketAddrs,
    {
        let addr = get_addr(to_addr)?;
        Ok(UdpMetricSink {
            addr,
            socket,
            stats: SocketStats::default(),
            resolver: None,
            _refresher: None,
        })
    }

    /// Construct a new `UdpMetricSink` that looks up `host` again once per
    /// `interval`.
    ///
    /// This is useful for dynamic environments where the Statsd server may be
    /// relocated. Lookups happen in a background thread so sending never waits
    /// on them; intervals shorter than 100ms are rounded up. If a lookup fails,
    /// or yields an address of a different family than the first one, the
    /// previous address keeps being used. The thread stops when the sink is
    /// dropped.
    ///
    /// # Failures
    ///
    /// This method fails if the initial lookup fails, if a local socket
    /// cannot be bound or if the background thread cannot be started.
    pub fn resolving(host: &str, interval: Duration) -> MetricResult<UdpMetricSink> {
        let addr = get_addr(host)?;
        let socket = bind_for(&addr)?;
        let resolver = Arc::new(Resolver::new(host, addr));
        let (refresher, _handle) = spawn_refresher(Arc::clone(&resolver), interval)
            .map_err(|e| MetricError::config("Unable to start resolver thread", e))?;

        Ok(UdpMetricSink {
            addr,
            socket,
            stats: SocketStats::default(),
            resolver: Some(resolver),
            _refresher: Some(refresher),
        })
    }

    /// Address packets are currently being sent to.
    pub fn addr(&self) -> SocketAddr {
        match self.resolver {
            Some(ref resolver) => resolver.current(),
            None => self.addr,
        }
    }
}

impl MetricSink for UdpMetricSink {
    fn emit(&self, metric: &str) -> io::Result<usize> {
        let addr = self.addr();
        self.stats
            .update(self.socket.send_to(metric.as_bytes(), addr), metric.len())
    }

    fn stats(&self) -> SinkStats {
        (&self.stats).into()
    }
}
