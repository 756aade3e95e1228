// Tallystick - A nil-safe Statsd client for Rust!
//
// Copyright 2015-2020 TSH Labs
// Copyright 2026 The Tallystick Authors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Export commonly used parts of Tallystick for easy glob imports
//!
//! # Example
//!
//! ```
//! use tallystick::prelude::*;
//! use tallystick::{StatsdClient, NopMetricSink};
//!
//! let client = StatsdClient::from_sink("some.prefix", NopMetricSink);
//!
//! client.inc("some.counter", 1, 1.0).unwrap();
//! client.timing("some.timer", 23, 1.0).unwrap();
//! client.gauge("some.gauge", 45, 1.0).unwrap();
//! client.histogram("some.histogram", 89.0, 1.0).unwrap();
//! client.set_int("some.set", 123, 1.0).unwrap();
//! ```

pub use crate::client::Statter;
