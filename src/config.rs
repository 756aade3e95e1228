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

use crate::format::TagFormat;
use std::time::Duration;

/// Settings for a `StatsdClient` sending over UDP.
///
/// Only `address` is required. An empty `prefix` means stat names are sent
/// exactly as given.
///
/// # Example
///
/// ```no_run
/// use tallystick::{ClientConfig, StatsdClient, TagFormat};
///
/// let config = ClientConfig {
///     tag_format: TagFormat::InfixComma,
///     ..ClientConfig::new("127.0.0.1:8125", "my.app")
/// };
/// let client = StatsdClient::from_config(&config).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientConfig {
    /// Destination `host:port`
    pub address: String,
    /// Prepended to every stat name, joined with a `.`
    pub prefix: String,
    /// Dialect used to write tags
    pub tag_format: TagFormat,
    /// How often to look up `address` again in the background, `None` to
    /// only look it up once
    pub resolve_interval: Option<Duration>,
}

impl ClientConfig {
    pub fn new<A, P>(address: A, prefix: P) -> Self
    where
        A: Into<String>,
        P: Into<String>,
    {
        ClientConfig {
            address: address.into(),
            prefix: prefix.into(),
            ..Default::default()
        }
    }
}
