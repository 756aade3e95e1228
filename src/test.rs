// Tallystick - A nil-safe Statsd client for Rust!
//
// Copyright 2019-2020 Nick Pillitteri
// Copyright 2026 The Tallystick Authors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Utilities for testing Tallystick itself.
//!
//! Functionality exported to be used by integration tests. This module
//! is NOT part of the Tallystick API and is subject to change at any time.

use crate::MetricSink;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub trait DatagramConsumer {
    fn accept(&self, datagram: String);
}

impl<F> DatagramConsumer for F
where
    F: Fn(String),
{
    fn accept(&self, datagram: String) {
        (self)(datagram);
    }
}

/// Basic server reading datagrams from a UDP socket on the loopback interface.
///
/// Each datagram is checked to be valid UTF-8 and handed to a consumer. Any
/// errors are printed to `stderr`. This server is only meant for testing the
/// packets Tallystick actually puts on the wire.
pub struct UdpSocketServer {
    shutdown: AtomicBool,
    socket: UdpSocket,
    consumer: Arc<dyn DatagramConsumer + Send + Sync + 'static>,
}

impl UdpSocketServer {
    /// Bind an ephemeral port on `127.0.0.1`, using the provided interval as
    /// the read timeout of its main loop.
    pub fn bind<C>(interval: Duration, consumer: C) -> io::Result<Self>
    where
        C: DatagramConsumer + Send + Sync + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        socket.set_read_timeout(Some(interval))?;

        Ok(UdpSocketServer {
            shutdown: AtomicBool::new(false),
            socket,
            consumer: Arc::new(consumer),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run until the `.shutdown()` method is called, passing datagrams to the consumer.
    pub fn run(&self) -> io::Result<()> {
        let mut buf = [0u8; 1024];

        loop {
            match self.socket.recv(&mut buf) {
                Ok(v) => match std::str::from_utf8(&buf[0..v]) {
                    Ok(s) => self.consumer.accept(s.to_owned()),
                    Err(e) => eprintln!("Error: Couldn't decode string to utf-8 {}", e),
                },
                Err(e) => {
                    // Timeouts are reported as WouldBlock or TimedOut depending on
                    // the platform and are the only chance to notice a shutdown.
                    if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut {
                        if self.shutdown.load(Ordering::Acquire) {
                            break;
                        }
                    } else {
                        eprintln!("Error: {} - {:?}", e, e.kind());
                    }
                }
            }
        }

        Ok(())
    }

    /// Indicate that the server should stop its main run loop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

/// Wrapper around a `UdpSocketServer` to start and stop it in the course
/// of running a single test.
///
/// The server is stopped and the thread it was running in is joined from
/// the destructor of this struct.
#[derive(Default)]
pub struct UdpServerHarness {
    server: Option<Arc<UdpSocketServer>>,
    thread: Option<JoinHandle<()>>,
}

impl UdpServerHarness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a server passing datagrams to `consumer` then run `body` with
    /// the address the server is listening on.
    pub fn run<C, F>(mut self, consumer: C, body: F)
    where
        C: DatagramConsumer + Send + Sync + 'static,
        F: FnOnce(SocketAddr),
    {
        let server = Arc::new(UdpSocketServer::bind(Duration::from_millis(50), consumer).unwrap());
        let server_local = Arc::clone(&server);
        let addr = server.local_addr().unwrap();

        let t = thread::spawn(move || {
            server_local.run().unwrap();
        });

        self.server = Some(server);
        self.thread = Some(t);

        body(addr);
    }
}

impl Drop for UdpServerHarness {
    fn drop(&mut self) {
        if let Some(s) = self.server.take() {
            s.shutdown();
        }

        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

/// `MetricSink` implementation that fails every write, for checking how
/// transport errors are surfaced.
#[derive(Debug, Clone)]
pub struct ErrorMetricSink {
    kind: ErrorKind,
}

impl ErrorMetricSink {
    pub fn always() -> Self {
        ErrorMetricSink {
            kind: ErrorKind::ConnectionRefused,
        }
    }
}

impl MetricSink for ErrorMetricSink {
    fn emit(&self, _metric: &str) -> io::Result<usize> {
        Err(io::Error::from(self.kind))
    }

    fn flush(&self) -> io::Result<()> {
        Err(io::Error::from(self.kind))
    }
}
