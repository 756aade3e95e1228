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

use crate::config::ClientConfig;
use crate::format::{MetricKind, MetricValue, PacketFormatter, TagFormat};
use crate::sampler::{AlwaysSample, Sampler};
use crate::sinks::{MetricSink, SinkStats, UdpMetricSink};
use crate::types::{ErrorKind, MetricError, MetricResult, Tag};
use log::debug;
use std::fmt;
use std::mem;
use std::panic::RefUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Trait for sending stats to a Statsd server.
///
/// Every kind of stat has a plain method and a `_with_tags` variant that
/// accepts tags. Tags are written in the order given using the dialect the
/// implementation was configured with. The `rate` is the sampling rate
/// used for the stat: `1.0` means it is sent every time and is left out
/// of the packet.
///
/// Each call writes at most one packet and returns the first error hit
/// while encoding or sending it. Implementations that are absent or closed
/// do nothing and return `Ok(())` for every call.
///
/// This trait is implemented by `StatsdClient` and by `Option<T>` for any
/// `Statter`, where `None` does nothing.
pub trait Statter {
    /// Encode and send a single stat. All other methods go through here.
    fn send_stat(&self, key: &str, kind: MetricKind, value: MetricValue<'_>, rate: f32, tags: &[Tag<'_>])
        -> MetricResult<()>;

    /// Release the underlying transport. Calling this more than once is allowed.
    fn close(&mut self) -> MetricResult<()>;

    /// Will stats sent with this instance actually be written anywhere?
    fn is_active(&self) -> bool;

    /// Set a gauge to an absolute value
    fn gauge(&self, key: &str, value: i64, rate: f32) -> MetricResult<()> {
        self.gauge_with_tags(key, value, rate, &[])
    }

    fn gauge_with_tags(&self, key: &str, value: i64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Gauge, MetricValue::Signed(value), rate, tags)
    }

    /// Set a gauge to an absolute floating point value
    fn gauge_float(&self, key: &str, value: f64, rate: f32) -> MetricResult<()> {
        self.gauge_float_with_tags(key, value, rate, &[])
    }

    fn gauge_float_with_tags(&self, key: &str, value: f64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Gauge, MetricValue::Float(value), rate, tags)
    }

    /// Adjust a gauge by a positive or negative amount, written as `+1` or `-1`
    fn gauge_delta(&self, key: &str, value: i64, rate: f32) -> MetricResult<()> {
        self.gauge_delta_with_tags(key, value, rate, &[])
    }

    fn gauge_delta_with_tags(&self, key: &str, value: i64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::GaugeDelta, MetricValue::Signed(value), rate, tags)
    }

    /// Adjust a gauge by a positive or negative floating point amount
    fn gauge_float_delta(&self, key: &str, value: f64, rate: f32) -> MetricResult<()> {
        self.gauge_float_delta_with_tags(key, value, rate, &[])
    }

    fn gauge_float_delta_with_tags(&self, key: &str, value: f64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::GaugeDelta, MetricValue::Float(value), rate, tags)
    }

    /// Increment a counter
    fn inc(&self, key: &str, value: i64, rate: f32) -> MetricResult<()> {
        self.inc_with_tags(key, value, rate, &[])
    }

    fn inc_with_tags(&self, key: &str, value: i64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Counter, MetricValue::Signed(value), rate, tags)
    }

    /// Decrement a counter, `value` is negated before being sent
    fn dec(&self, key: &str, value: i64, rate: f32) -> MetricResult<()> {
        self.dec_with_tags(key, value, rate, &[])
    }

    fn dec_with_tags(&self, key: &str, value: i64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        if !self.is_active() {
            return Ok(());
        }

        match value.checked_neg() {
            Some(v) => self.send_stat(key, MetricKind::Counter, MetricValue::Signed(v), rate, tags),
            None => Err(MetricError::from((
                ErrorKind::InvalidValue,
                "Counter decrement overflows",
            ))),
        }
    }

    /// Record a timing in milliseconds
    fn timing(&self, key: &str, millis: i64, rate: f32) -> MetricResult<()> {
        self.timing_with_tags(key, millis, rate, &[])
    }

    fn timing_with_tags(&self, key: &str, millis: i64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Timing, MetricValue::Signed(millis), rate, tags)
    }

    /// Record a timing, written as fractional milliseconds (1500µs is `1.5`)
    fn timing_duration(&self, key: &str, time: Duration, rate: f32) -> MetricResult<()> {
        self.timing_duration_with_tags(key, time, rate, &[])
    }

    fn timing_duration_with_tags(&self, key: &str, time: Duration, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Timing, MetricValue::Float(as_millis_f64(time)), rate, tags)
    }

    /// Add a string to a set. The string is sent unescaped so it must not
    /// contain `:`, `|`, `,` or `;`.
    fn set(&self, key: &str, value: &str, rate: f32) -> MetricResult<()> {
        self.set_with_tags(key, value, rate, &[])
    }

    fn set_with_tags(&self, key: &str, value: &str, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Set, MetricValue::Str(value), rate, tags)
    }

    /// Add an integer to a set
    fn set_int(&self, key: &str, value: i64, rate: f32) -> MetricResult<()> {
        self.set_int_with_tags(key, value, rate, &[])
    }

    fn set_int_with_tags(&self, key: &str, value: i64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Set, MetricValue::Signed(value), rate, tags)
    }

    /// Add a floating point value to a set
    fn set_float(&self, key: &str, value: f64, rate: f32) -> MetricResult<()> {
        self.set_float_with_tags(key, value, rate, &[])
    }

    fn set_float_with_tags(&self, key: &str, value: f64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Set, MetricValue::Float(value), rate, tags)
    }

    /// Record a value in a histogram
    fn histogram(&self, key: &str, value: f64, rate: f32) -> MetricResult<()> {
        self.histogram_with_tags(key, value, rate, &[])
    }

    fn histogram_with_tags(&self, key: &str, value: f64, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Histogram, MetricValue::Float(value), rate, tags)
    }

    /// Send a preformatted value that already carries its type, e.g. `"1|c"`
    fn raw(&self, key: &str, value: &str, rate: f32) -> MetricResult<()> {
        self.raw_with_tags(key, value, rate, &[])
    }

    fn raw_with_tags(&self, key: &str, value: &str, rate: f32, tags: &[Tag<'_>]) -> MetricResult<()> {
        self.send_stat(key, MetricKind::Raw, MetricValue::Str(value), rate, tags)
    }
}

impl<T> Statter for Option<T>
where
    T: Statter,
{
    fn send_stat(
        &self,
        key: &str,
        kind: MetricKind,
        value: MetricValue<'_>,
        rate: f32,
        tags: &[Tag<'_>],
    ) -> MetricResult<()> {
        match self {
            Some(statter) => statter.send_stat(key, kind, value, rate, tags),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> MetricResult<()> {
        match self {
            Some(statter) => statter.close(),
            None => Ok(()),
        }
    }

    fn is_active(&self) -> bool {
        self.as_ref().map_or(false, Statter::is_active)
    }
}

fn as_millis_f64(time: Duration) -> f64 {
    time.as_nanos() as f64 / 1_000_000.0
}

fn join_prefix(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_owned(),
        (false, true) => parent.to_owned(),
        (false, false) => format!("{}.{}", parent, child),
    }
}

/// Builder for creating and customizing `StatsdClient` instances.
///
/// Instances of the builder should be created by calling the `::builder()`
/// method on the `StatsdClient` struct.
///
/// # Example
///
/// ```
/// use tallystick::prelude::*;
/// use tallystick::{StatsdClient, SpyMetricSink, TagFormat};
///
/// let (rx, sink) = SpyMetricSink::new();
/// let client = StatsdClient::builder("some.prefix", sink)
///     .with_tag_format(TagFormat::InfixSemicolon)
///     .with_tag("env", "prod")
///     .build();
///
/// client.inc("some.counter", 1, 1.0).unwrap();
/// let sent = rx.recv().unwrap();
///
/// assert_eq!(b"some.prefix.some.counter;env=prod:1|c", sent.as_slice());
/// ```
pub struct StatsdClientBuilder {
    prefix: String,
    sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    sampler: Box<dyn Sampler + Sync + Send + RefUnwindSafe>,
    tag_format: TagFormat,
    tags: Vec<(String, String)>,
}

impl StatsdClientBuilder {
    // Set the required fields and defaults for optional fields
    fn new<T>(prefix: &str, sink: T) -> Self
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        StatsdClientBuilder {
            // required
            prefix: prefix.to_owned(),
            sink: Box::new(sink),

            // optional with defaults
            sampler: Box::new(AlwaysSample),
            tag_format: TagFormat::default(),
            tags: Vec::new(),
        }
    }

    /// Set the dialect used to write tags, suffix octothorpe by default.
    pub fn with_tag_format(mut self, tag_format: TagFormat) -> Self {
        self.tag_format = tag_format;
        self
    }

    /// Set the `Sampler` deciding which sampled stats are actually sent.
    ///
    /// By default every stat is sent and sampling is left to the server.
    pub fn with_sampler<S>(mut self, sampler: S) -> Self
    where
        S: Sampler + Sync + Send + RefUnwindSafe + 'static,
    {
        self.sampler = Box::new(sampler);
        self
    }

    /// Add a tag written with every stat, before any tags given per call.
    pub fn with_tag<K, V>(mut self, key: K, value: V) -> Self
    where
        K: ToString,
        V: ToString,
    {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    /// Construct a new `StatsdClient` instance based on current settings.
    pub fn build(self) -> StatsdClient {
        StatsdClient::from_builder(self)
    }
}

/// Settings and transport shared by a client and its sub-statters.
struct Shared {
    sink: Box<dyn MetricSink + Sync + Send + RefUnwindSafe>,
    sampler: Box<dyn Sampler + Sync + Send + RefUnwindSafe>,
    tag_format: TagFormat,
    tags: Vec<(String, String)>,
}

impl Shared {
    fn tags(&self) -> impl Iterator<Item = Tag<'_>> {
        self.tags.iter().map(|(k, v)| Tag::new(k, v))
    }
}

struct ActiveClient {
    prefix: String,
    shared: Arc<Shared>,
}

impl ActiveClient {
    fn send_stat(
        &self,
        key: &str,
        kind: MetricKind,
        value: MetricValue<'_>,
        rate: f32,
        tags: &[Tag<'_>],
    ) -> MetricResult<()> {
        let mut formatter = PacketFormatter::new(&self.prefix, key, kind, value)?;
        if !self.shared.sampler.sample(rate) {
            return Ok(());
        }

        formatter.with_sample_rate(rate);
        formatter.with_tags(self.shared.tags());
        formatter.with_tags(tags.iter().copied());

        let packet = formatter.format(self.shared.tag_format);
        self.shared.sink.emit(&packet)?;
        Ok(())
    }

    fn release(self) -> MetricResult<()> {
        debug!("closing statsd client with prefix {:?}", self.prefix);
        self.shared.sink.flush()?;
        Ok(())
    }
}

enum ClientState {
    Absent,
    Active(ActiveClient),
    Closed,
}

/// Client for Statsd that implements the `Statter` trait.
///
/// A client is in one of three states:
///
/// * **Active** - created from a sink or an address, stats are encoded and
///   written to the sink.
/// * **Absent** - created with `StatsdClient::absent()` (or `Default`), for
///   example when building a real client failed. Nothing is encoded or written
///   and every method returns `Ok(())`.
/// * **Closed** - after `.close()` on an active client. Behaves exactly like
///   an absent client.
///
/// This lets applications build a client once at startup, fall back to an
/// absent one if that fails, and send stats unconditionally afterwards.
///
/// # Example
///
/// ```
/// use tallystick::prelude::*;
/// use tallystick::StatsdClient;
///
/// let mut client = StatsdClient::new("not a valid address", "my.app").unwrap_or_default();
///
/// assert!(!client.is_active());
/// assert!(client.inc("some.counter", 1, 1.0).is_ok());
/// assert!(client.close().is_ok());
/// ```
///
/// Metric methods take `&self` and can be called from many threads at once
/// (wrap the client in an `Arc`). No locking is done by the client itself;
/// concurrent sends are only as safe as the sink, and all sinks in this crate
/// are safe to share.
pub struct StatsdClient {
    state: ClientState,
}

impl StatsdClient {
    /// Create a new client sending to `address` over UDP, writing tags using
    /// the suffix octothorpe dialect.
    ///
    /// # Failures
    ///
    /// Fails with an `InvalidConfig` error when the address cannot be parsed
    /// or resolved, or a local socket cannot be bound. An address nobody is
    /// listening on is not an error.
    pub fn new(address: &str, prefix: &str) -> MetricResult<Self> {
        Self::from_config(&ClientConfig::new(address, prefix))
    }

    /// Create a new client sending over UDP using the given configuration.
    ///
    /// # Failures
    ///
    /// Fails under the same conditions as `StatsdClient::new`.
    pub fn from_config(config: &ClientConfig) -> MetricResult<Self> {
        let sink = match config.resolve_interval {
            Some(interval) => UdpMetricSink::resolving(&config.address, interval)?,
            None => UdpMetricSink::open(config.address.as_str())?,
        };

        debug!(
            "sending stats to {} with prefix {:?} and {} tags",
            config.address, config.prefix, config.tag_format
        );

        Ok(Self::builder(&config.prefix, sink)
            .with_tag_format(config.tag_format)
            .build())
    }

    /// Create a new client instance that will use the given prefix for
    /// all metrics emitted to the given `MetricSink` implementation.
    ///
    /// # Example
    ///
    /// ```
    /// use tallystick::{StatsdClient, NopMetricSink};
    ///
    /// let prefix = "my.stats";
    /// let client = StatsdClient::from_sink(prefix, NopMetricSink);
    /// ```
    pub fn from_sink<T>(prefix: &str, sink: T) -> Self
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        Self::builder(prefix, sink).build()
    }

    /// Create a new builder with the provided prefix and metric sink.
    pub fn builder<T>(prefix: &str, sink: T) -> StatsdClientBuilder
    where
        T: MetricSink + Sync + Send + RefUnwindSafe + 'static,
    {
        StatsdClientBuilder::new(prefix, sink)
    }

    /// Create a client that does nothing.
    pub fn absent() -> Self {
        StatsdClient {
            state: ClientState::Absent,
        }
    }

    /// Create a client sharing this client's sink, sampler, tag dialect and
    /// default tags, with `prefix` appended to this client's prefix.
    ///
    /// Sub-statters of absent or closed clients are absent. Closing a
    /// sub-statter does not affect its parent; the sink is released once
    /// every client sharing it has been closed or dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use tallystick::prelude::*;
    /// use tallystick::{StatsdClient, SpyMetricSink};
    ///
    /// let (rx, sink) = SpyMetricSink::new();
    /// let client = StatsdClient::from_sink("app", sink);
    /// let db = client.sub_statter("db");
    ///
    /// db.timing("query", 12, 1.0).unwrap();
    ///
    /// assert_eq!(b"app.db.query:12|ms", rx.recv().unwrap().as_slice());
    /// ```
    pub fn sub_statter(&self, prefix: &str) -> StatsdClient {
        match self.state {
            ClientState::Active(ref active) => StatsdClient {
                state: ClientState::Active(ActiveClient {
                    prefix: join_prefix(&active.prefix, prefix),
                    shared: Arc::clone(&active.shared),
                }),
            },
            _ => StatsdClient::absent(),
        }
    }

    /// Prefix used for stats, `None` when absent or closed.
    pub fn prefix(&self) -> Option<&str> {
        match self.state {
            ClientState::Active(ref active) => Some(&active.prefix),
            _ => None,
        }
    }

    /// Dialect used for tags, `None` when absent or closed.
    pub fn tag_format(&self) -> Option<TagFormat> {
        match self.state {
            ClientState::Active(ref active) => Some(active.shared.tag_format),
            _ => None,
        }
    }

    /// I/O telemetry of the underlying sink, zeros when absent or closed.
    pub fn stats(&self) -> SinkStats {
        match self.state {
            ClientState::Active(ref active) => active.shared.sink.stats(),
            _ => SinkStats::default(),
        }
    }

    /// Flush the underlying sink, does nothing when absent or closed.
    pub fn flush(&self) -> MetricResult<()> {
        match self.state {
            ClientState::Active(ref active) => Ok(active.shared.sink.flush()?),
            _ => Ok(()),
        }
    }

    // Create a new StatsdClient by consuming the builder
    fn from_builder(builder: StatsdClientBuilder) -> Self {
        StatsdClient {
            state: ClientState::Active(ActiveClient {
                prefix: builder.prefix,
                shared: Arc::new(Shared {
                    sink: builder.sink,
                    sampler: builder.sampler,
                    tag_format: builder.tag_format,
                    tags: builder.tags,
                }),
            }),
        }
    }
}

impl Default for StatsdClient {
    fn default() -> Self {
        Self::absent()
    }
}

impl Statter for StatsdClient {
    fn send_stat(
        &self,
        key: &str,
        kind: MetricKind,
        value: MetricValue<'_>,
        rate: f32,
        tags: &[Tag<'_>],
    ) -> MetricResult<()> {
        match self.state {
            ClientState::Active(ref active) => active.send_stat(key, kind, value, rate, tags),
            ClientState::Absent | ClientState::Closed => Ok(()),
        }
    }

    fn close(&mut self) -> MetricResult<()> {
        match mem::replace(&mut self.state, ClientState::Closed) {
            ClientState::Active(active) => active.release(),
            ClientState::Absent => {
                self.state = ClientState::Absent;
                Ok(())
            }
            ClientState::Closed => Ok(()),
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state, ClientState::Active(_))
    }
}

impl fmt::Debug for StatsdClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            ClientState::Active(ref active) => write!(
                f,
                "StatsdClient {{ prefix: {:?}, sink: ..., sampler: ..., tag_format: {:?}, tags: {:?} }}",
                active.prefix, active.shared.tag_format, active.shared.tags,
            ),
            ClientState::Absent => f.write_str("StatsdClient { absent }"),
            ClientState::Closed => f.write_str("StatsdClient { closed }"),
        }
    }
}
