use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tallystick::prelude::*;
use tallystick::{StatsdClient, Tag};

#[allow(dead_code)]
pub const NUM_THREADS: u64 = 100;

#[allow(dead_code)]
pub const NUM_ITERATIONS: u64 = 1_000;

#[allow(dead_code)]
pub fn run_arc_threaded_test(client: StatsdClient, num_threads: u64, iterations: u64) {
    let shared_client = Arc::new(client);

    let threads: Vec<_> = (0..num_threads)
        .map(|_| {
            let local_client = Arc::clone(&shared_client);

            thread::spawn(move || {
                for i in 0..iterations {
                    let tags = [Tag::new("iteration", "x")];

                    local_client.inc("some.counter", i as i64, 1.0).unwrap();
                    local_client.dec("some.counter", i as i64, 0.5).unwrap();
                    local_client.timing("some.timer", i as i64, 1.0).unwrap();
                    local_client
                        .timing_duration("some.timer", Duration::from_micros(i), 1.0)
                        .unwrap();
                    local_client.gauge("some.gauge", i as i64, 1.0).unwrap();
                    local_client.gauge_float("some.gauge", i as f64, 1.0).unwrap();
                    local_client.gauge_delta_with_tags("some.gauge", 1, 1.0, &tags).unwrap();
                    local_client.histogram("some.histogram", i as f64, 1.0).unwrap();
                    local_client.set_int("some.set", i as i64, 1.0).unwrap();
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }
}
