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

use std::error;
use std::fmt;
use std::io;

/// A single key-value annotation attached to a metric.
///
/// Tags are an extension to the Statsd protocol and are written using one
/// of the dialects described by `TagFormat`. The order in which tags are
/// given to a client is the order in which they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> Tag<'a> {
    pub fn new(key: &'a str, value: &'a str) -> Self {
        Tag { key, value }
    }
}

impl<'a> From<(&'a str, &'a str)> for Tag<'a> {
    fn from((key, value): (&'a str, &'a str)) -> Self {
        Tag { key, value }
    }
}

/// Potential categories an error from this library falls into.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorKind {
    /// The client could not be constructed: the address could not be parsed
    /// or resolved, or a local socket could not be prepared.
    InvalidConfig,
    /// The value given is not valid for the requested kind of metric.
    InvalidValue,
    /// The underlying transport failed to send a packet.
    IoError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::InvalidConfig => "invalid configuration".fmt(f),
            ErrorKind::InvalidValue => "invalid metric value".fmt(f),
            ErrorKind::IoError => "I/O error".fmt(f),
        }
    }
}

/// Error generated by this library.
///
/// Errors are returned from the call that caused them and are never retried
/// or logged by the client itself.
#[derive(Debug)]
pub struct MetricError {
    repr: ErrorRepr,
}

#[derive(Debug)]
enum ErrorRepr {
    WithDescription(ErrorKind, &'static str),
    IoError(io::Error),
    Config(&'static str, io::Error),
}

impl MetricError {
    /// Return the kind of the error
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::IoError(_) => ErrorKind::IoError,
            ErrorRepr::Config(_, _) => ErrorKind::InvalidConfig,
            ErrorRepr::WithDescription(kind, _) => kind,
        }
    }

    /// Wrap an I/O error raised while preparing a client so that it is
    /// reported as a configuration error rather than a send failure.
    pub(crate) fn config(desc: &'static str, err: io::Error) -> MetricError {
        MetricError {
            repr: ErrorRepr::Config(desc, err),
        }
    }
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            ErrorRepr::IoError(ref err) => err.fmt(f),
            ErrorRepr::Config(desc, ref err) => write!(f, "{}: {}", desc, err),
            ErrorRepr::WithDescription(_, desc) => desc.fmt(f),
        }
    }
}

impl error::Error for MetricError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.repr {
            ErrorRepr::IoError(ref err) => Some(err),
            ErrorRepr::Config(_, ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MetricError {
    /// Convert an `io::Error` into a `MetricError`
    fn from(err: io::Error) -> MetricError {
        MetricError {
            repr: ErrorRepr::IoError(err),
        }
    }
}

impl From<(ErrorKind, &'static str)> for MetricError {
    /// Convert an error kind and description into a `MetricError`
    fn from((kind, desc): (ErrorKind, &'static str)) -> MetricError {
        MetricError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

/// Result of attempting to send a metric.
pub type MetricResult<T> = Result<T, MetricError>;
