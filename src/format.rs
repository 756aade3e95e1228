// Tallystick - A nil-safe Statsd client for Rust!
//
// Copyright 2018 Philip Jenvey <pjenvey@mozilla.com>
// Copyright 2018-2021 Nick Pillitteri
// Copyright 2026 The Tallystick Authors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Conversion of metric observations into Statsd wire packets.
//!
//! Everything in this module is a pure transformation: no I/O is performed
//! and the same input always produces the same bytes.

use crate::types::{ErrorKind, MetricError, MetricResult, Tag};
use std::fmt::{self, Write};
use std::str::FromStr;

/// Type of metric, selecting the type suffix and how its value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    /// Gauge adjustment, always written with an explicit sign
    GaugeDelta,
    Timing,
    Set,
    Histogram,
    /// Caller supplied value that already includes its own type suffix
    Raw,
}

impl MetricKind {
    /// Type suffix written after the value, `None` for raw stats.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            MetricKind::Counter => Some("c"),
            MetricKind::Gauge | MetricKind::GaugeDelta => Some("g"),
            MetricKind::Timing => Some("ms"),
            MetricKind::Set => Some("s"),
            MetricKind::Histogram => Some("h"),
            MetricKind::Raw => None,
        }
    }

    fn forces_sign(self) -> bool {
        self == MetricKind::GaugeDelta
    }
}

/// Holder for primitive metric values that knows how to display itself
///
/// Floating point values are written using the shortest representation that
/// round-trips, without an exponent (`1.5`, `0.003`, `100`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue<'a> {
    Signed(i64),
    Float(f64),
    Str(&'a str),
}

impl<'a> MetricValue<'a> {
    fn is_sign_negative(&self) -> bool {
        match *self {
            MetricValue::Signed(v) => v < 0,
            MetricValue::Float(v) => v.is_sign_negative(),
            MetricValue::Str(_) => false,
        }
    }

    fn size_hint(&self) -> usize {
        match *self {
            MetricValue::Str(s) => s.len(),
            // sign plus enough digits for most values seen in practice
            _ => 12,
        }
    }
}

impl<'a> fmt::Display for MetricValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricValue::Signed(v) => v.fmt(f),
            MetricValue::Float(v) => v.fmt(f),
            MetricValue::Str(v) => f.write_str(v),
        }
    }
}

/// Dialect used to embed tags in a packet.
///
/// * `SuffixOctothorpe` - Datadog style, `name:1|c|#k1:v1,k2:v2`
/// * `InfixComma` - Influx style, `name,k1=v1,k2=v2:1|c`
/// * `InfixSemicolon` - Graphite style, `name;k1=v1;k2=v2:1|c`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TagFormat {
    #[default]
    SuffixOctothorpe,
    InfixComma,
    InfixSemicolon,
}

impl TagFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TagFormat::SuffixOctothorpe => "suffix-octothorpe",
            TagFormat::InfixComma => "infix-comma",
            TagFormat::InfixSemicolon => "infix-semicolon",
        }
    }
}

impl fmt::Display for TagFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

impl FromStr for TagFormat {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suffix-octothorpe" => Ok(TagFormat::SuffixOctothorpe),
            "infix-comma" => Ok(TagFormat::InfixComma),
            "infix-semicolon" => Ok(TagFormat::InfixSemicolon),
            _ => Err(MetricError::from((ErrorKind::InvalidConfig, "Unknown tag format"))),
        }
    }
}

/// Check that a value is of a category the given kind of metric can carry.
fn check_value(kind: MetricKind, value: &MetricValue<'_>) -> MetricResult<()> {
    match (kind, value) {
        (MetricKind::Set, MetricValue::Str(_)) | (MetricKind::Raw, MetricValue::Str(_)) => Ok(()),
        (MetricKind::Raw, _) => Err(MetricError::from((
            ErrorKind::InvalidValue,
            "Raw stats require a string value",
        ))),
        (_, MetricValue::Str(_)) => Err(MetricError::from((
            ErrorKind::InvalidValue,
            "String values are only valid for sets",
        ))),
        (MetricKind::Counter, MetricValue::Float(_)) => Err(MetricError::from((
            ErrorKind::InvalidValue,
            "Counter values must be integers",
        ))),
        (_, MetricValue::Float(v)) if !v.is_finite() => Err(MetricError::from((
            ErrorKind::InvalidValue,
            "Float values must be finite",
        ))),
        _ => Ok(()),
    }
}

/// Write tags between the stat name and the value, each preceded by `sep`.
fn write_infix_tags(out: &mut String, tags: &[Tag<'_>], sep: char) {
    for tag in tags {
        out.push(sep);
        out.push_str(tag.key);
        out.push('=');
        out.push_str(tag.value);
    }
}

/// Write tags at the very end of the packet, after any sample rate.
fn write_suffix_tags(out: &mut String, tags: &[Tag<'_>]) {
    if tags.is_empty() {
        return;
    }

    out.push_str("|#");
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(tag.key);
        out.push(':');
        out.push_str(tag.value);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PacketFormatter<'a> {
    prefix: &'a str,
    key: &'a str,
    kind: MetricKind,
    value: MetricValue<'a>,
    rate: f32,
    tags: Vec<Tag<'a>>,
    base_size: usize,
    kv_size: usize,
}

impl<'a> PacketFormatter<'a> {
    const NO_SAMPLING: f32 = 1.0;

    #[rustfmt::skip]
    pub(crate) fn new(prefix: &'a str, key: &'a str, kind: MetricKind, value: MetricValue<'a>) -> MetricResult<Self> {
        check_value(kind, &value)?;
        Ok(PacketFormatter {
            prefix,
            key,
            kind,
            value,
            rate: Self::NO_SAMPLING,
            tags: Vec::new(),
            // running total of the bytes needed for tags so that we can size the
            // output buffer without another pass over them when formatting.
            kv_size: 0,
            base_size: prefix.len() + 1 /* . */ + key.len() + 1 /* : */ + value.size_hint() + 1 /* | */ + 2, /* type */
        })
    }

    pub(crate) fn with_sample_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    pub(crate) fn with_tags<'b, I>(&mut self, tags: I)
    where
        'b: 'a,
        I: IntoIterator<Item = Tag<'b>>,
    {
        for tag in tags {
            self.kv_size += 1 /* separator */ + tag.key.len() + 1 /* : or = */ + tag.value.len();
            self.tags.push(tag);
        }
    }

    fn is_sampled(&self) -> bool {
        self.rate != Self::NO_SAMPLING
    }

    fn write_name(&self, out: &mut String) {
        if !self.prefix.is_empty() {
            out.push_str(self.prefix);
            out.push('.');
        }
        out.push_str(self.key);
    }

    fn write_value(&self, out: &mut String) {
        if self.kind.forces_sign() && !self.value.is_sign_negative() {
            out.push('+');
        }
        let _ = write!(out, "{}", self.value);
    }

    fn write_rate(&self, out: &mut String) {
        if self.is_sampled() {
            let _ = write!(out, "|@{}", self.rate);
        }
    }

    fn size_hint(&self) -> usize {
        let rate = if self.is_sampled() { 12 } else { 0 };
        let tags = if self.tags.is_empty() { 0 } else { 2 /* |# */ + self.kv_size };
        self.base_size + rate + tags
    }

    pub(crate) fn format(&self, tag_format: TagFormat) -> String {
        let mut out = String::with_capacity(self.size_hint());
        self.write_name(&mut out);

        match tag_format {
            TagFormat::InfixComma => write_infix_tags(&mut out, &self.tags, ','),
            TagFormat::InfixSemicolon => write_infix_tags(&mut out, &self.tags, ';'),
            TagFormat::SuffixOctothorpe => {}
        }

        out.push(':');
        self.write_value(&mut out);
        if let Some(suffix) = self.kind.suffix() {
            out.push('|');
            out.push_str(suffix);
        }
        self.write_rate(&mut out);

        if tag_format == TagFormat::SuffixOctothorpe {
            write_suffix_tags(&mut out, &self.tags);
        }

        out
    }
}

/// Encode a single stat as a Statsd packet.
///
/// `full_name` is written as-is (any prefix must already be applied). The
/// sample rate is only written when it is not exactly `1.0` and tags are only
/// written when there is at least one of them. An error is returned when the
/// value is not valid for the kind of metric, e.g. a string for a counter.
///
/// # Example
///
/// ```
/// use tallystick::{encode, MetricKind, MetricValue, Tag, TagFormat};
///
/// let tags = [Tag::new("host", "web01")];
/// let packet = encode("app.requests", MetricKind::Counter, MetricValue::Signed(1), 0.5, &tags, TagFormat::InfixComma);
///
/// assert_eq!("app.requests,host=web01:1|c|@0.5", packet.unwrap());
/// ```
pub fn encode(
    full_name: &str,
    kind: MetricKind,
    value: MetricValue<'_>,
    rate: f32,
    tags: &[Tag<'_>],
    tag_format: TagFormat,
) -> MetricResult<String> {
    let mut formatter = PacketFormatter::new("", full_name, kind, value)?;
    formatter.with_sample_rate(rate);
    formatter.with_tags(tags.iter().copied());
    Ok(formatter.format(tag_format))
}
