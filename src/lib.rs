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

//! A Statsd client for Rust that is safe to use even when it could not be
//! set up.
//!
//! Tallystick sends counters, gauges, timings, sets and histograms to a
//! Statsd compatible server over UDP, one datagram per stat. Tags can be
//! attached to any stat and written in one of three common dialects.
//!
//! ## Features
//!
//! * Absent clients: a `StatsdClient` that could not be created (or was
//!   closed) accepts every call and does nothing, so application code never
//!   has to check whether metrics are enabled.
//! * Three tag dialects, see `TagFormat`.
//! * Sub-statters that share a transport and extend the prefix.
//! * Pluggable `MetricSink` transports and client side `Sampler`s.
//!
//! ## Install
//!
//! To make use of `tallystick` in your project, add it as a dependency in your
//! `Cargo.toml` file.
//!
//! ``` toml
//! [dependencies]
//! tallystick = "x.y.z"
//! ```
//!
//! Enable the `sample-rate` feature to get `RandomSampler`, which drops stats
//! on the client side according to their sample rate.
//!
//! ## Usage
//!
//! ### Simple Use
//!
//! Build a client from an address and a prefix. If that fails, fall back to
//! an absent client and keep going.
//!
//! ``` rust,no_run
//! use std::time::Duration;
//! use tallystick::prelude::*;
//! use tallystick::StatsdClient;
//!
//! let client = StatsdClient::new("127.0.0.1:8125", "my.app").unwrap_or_default();
//!
//! client.inc("requests", 1, 1.0).unwrap();
//! client.gauge("workers", 8, 1.0).unwrap();
//! client.timing_duration("db.query", Duration::from_micros(1500), 0.1).unwrap();
//! client.set("users", "alice", 1.0).unwrap();
//! ```
//!
//! ### Tags
//!
//! Tags are passed to the `_with_tags` variant of each method and written in
//! the dialect selected when the client was created.
//!
//! ``` rust
//! use tallystick::prelude::*;
//! use tallystick::{StatsdClient, SpyMetricSink, Tag, TagFormat};
//!
//! let (rx, sink) = SpyMetricSink::new();
//! let client = StatsdClient::builder("my.app", sink)
//!     .with_tag_format(TagFormat::InfixComma)
//!     .build();
//!
//! client.inc_with_tags("requests", 1, 1.0, &[Tag::new("host", "web01")]).unwrap();
//!
//! assert_eq!(b"my.app.requests,host=web01:1|c", rx.recv().unwrap().as_slice());
//! ```
//!
//! ### Absent Clients
//!
//! `Option<StatsdClient>` also implements `Statter`, so code that only
//! sometimes has a client can call it unconditionally.
//!
//! ``` rust
//! use tallystick::prelude::*;
//! use tallystick::StatsdClient;
//!
//! let client: Option<StatsdClient> = None;
//! assert!(client.inc("requests", 1, 1.0).is_ok());
//!
//! let client = StatsdClient::absent();
//! assert!(client.gauge("workers", 8, 1.0).is_ok());
//! ```
//!
//! ### Custom Metric Sinks
//!
//! Anything implementing `MetricSink` can be used as the transport of a
//! client. Each call to `emit` is given one complete packet.
//!
//! ``` rust
//! use std::io;
//! use tallystick::prelude::*;
//! use tallystick::{MetricSink, StatsdClient};
//!
//! pub struct MyMetricSink;
//!
//! impl MetricSink for MyMetricSink {
//!     fn emit(&self, metric: &str) -> io::Result<usize> {
//!         // Your custom metric sink implementation goes here!
//!         Ok(metric.len())
//!     }
//! }
//!
//! let client = StatsdClient::from_sink("my.prefix", MyMetricSink);
//! client.inc("my.counter.thing", 42, 1.0).unwrap();
//! ```

#![forbid(unsafe_code)]

pub const DEFAULT_PORT: u16 = 8125;

pub use self::client::{StatsdClient, StatsdClientBuilder, Statter};

pub use self::config::ClientConfig;

pub use self::format::{encode, MetricKind, MetricValue, TagFormat};

#[cfg(feature = "sample-rate")]
pub use self::sampler::RandomSampler;
pub use self::sampler::{AlwaysSample, Sampler};

pub use self::sinks::{MetricSink, NopMetricSink, SinkStats, SpyMetricSink, UdpMetricSink};

pub use self::types::{ErrorKind, MetricError, MetricResult, Tag};

mod client;
mod config;
mod format;
pub mod prelude;
mod sampler;
mod sinks;
mod types;

// Utilities for running integration tests against a local UDP socket.
#[doc(hidden)]
pub mod test;
