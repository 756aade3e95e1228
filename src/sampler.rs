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

#[cfg(feature = "sample-rate")]
pub use rng::RandomSampler;

/// Decides, on the client side, whether a stat sent with a given sample
/// rate is actually written to the sink.
///
/// The rate is always written into the packet regardless of what the
/// sampler decides so that servers can scale values back up. Stats that
/// are not sampled are silently skipped: the client method returns `Ok`
/// without writing anything.
pub trait Sampler {
    fn sample(&self, rate: f32) -> bool;
}

/// `Sampler` that includes every stat, leaving all sampling to the server.
///
/// This is the default for every client and keeps the behavior of exactly
/// one packet written per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSample;

impl Sampler for AlwaysSample {
    fn sample(&self, _rate: f32) -> bool {
        true
    }
}

impl<F> Sampler for F
where
    F: Fn(f32) -> bool,
{
    fn sample(&self, rate: f32) -> bool {
        (self)(rate)
    }
}

#[cfg(feature = "sample-rate")]
mod rng {
    use super::Sampler;
    use rand::Rng;

    /// `Sampler` that includes a stat with a probability equal to its rate.
    ///
    /// Stats with a rate of `1.0` or more are always included.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomSampler;

    impl Sampler for RandomSampler {
        fn sample(&self, rate: f32) -> bool {
            if rate >= 1.0 {
                return true;
            }
            if rate <= 0.0 || rate.is_nan() {
                return false;
            }

            let mut rng = rand::thread_rng();
            rng.gen_bool(rate.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AlwaysSample, Sampler};

    #[test]
    fn test_always_sample() {
        assert!(AlwaysSample.sample(1.0));
        assert!(AlwaysSample.sample(0.000001));
    }

    #[test]
    fn test_closure_sampler() {
        let never = |_rate: f32| false;
        assert!(!never.sample(1.0));
    }

    #[cfg(feature = "sample-rate")]
    #[test]
    fn test_random_sampler_bounds() {
        use super::RandomSampler;

        assert!(RandomSampler.sample(1.0));
        assert!(!RandomSampler.sample(0.0));
        assert!(!RandomSampler.sample(-2.0));
    }

    #[cfg(feature = "sample-rate")]
    #[test]
    fn test_random_sampler_actually_samples() {
        use super::RandomSampler;

        let included = (0..1000).filter(|_| RandomSampler.sample(0.5)).count();

        assert!(included > 0); // always happening (probably)
        assert!(included < 1000); // never happening (probably)
    }
}
