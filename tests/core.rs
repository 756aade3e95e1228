use std::time::Duration;
use tallystick::prelude::*;
use tallystick::{encode, MetricKind, MetricValue, NopMetricSink, StatsdClient, Tag, TagFormat};

mod utils;
use utils::run_arc_threaded_test;

fn new_nop_client(prefix: &str) -> StatsdClient {
    StatsdClient::from_sink(prefix, NopMetricSink)
}

#[test]
fn test_statsd_client_nop_sink_single_threaded() {
    let client = new_nop_client("tallystick");
    run_arc_threaded_test(client, 1, 1);
}

#[test]
fn test_statsd_client_absent_single_threaded() {
    run_arc_threaded_test(StatsdClient::absent(), 1, 1);
}

#[test]
fn test_statsd_client_absent_many_threaded() {
    run_arc_threaded_test(StatsdClient::default(), 10, 10);
}

#[test]
fn test_statsd_client_closed_every_operation() {
    let mut client = new_nop_client("tallystick");
    client.close().unwrap();
    let tags = [Tag::new("a", "b")];

    assert!(client.gauge_with_tags("gauge", 1, 1.0, &tags).is_ok());
    assert!(client.gauge_float_delta("gauge", f64::NAN, 1.0).is_ok());
    assert!(client.dec("count", i64::MIN, 1.0).is_ok());
    assert!(client.timing_duration("timing", Duration::from_secs(1), 1.0).is_ok());
    assert!(client.set_float("set", 1.5, 1.0).is_ok());
    assert!(client.raw("raw", "1|c", 1.0).is_ok());
    assert!(client.flush().is_ok());
    assert_eq!(None, client.prefix());
    assert_eq!(None, client.tag_format());
}

#[test]
fn test_encode_matches_client_output() {
    let tags = [Tag::new("tag1", "val1"), Tag::new("tag2", "val2")];
    let packet = encode(
        "test.gauge",
        MetricKind::GaugeDelta,
        MetricValue::Float(1.1),
        0.5,
        &tags,
        TagFormat::SuffixOctothorpe,
    )
    .unwrap();

    assert_eq!("test.gauge:+1.1|g|@0.5|#tag1:val1,tag2:val2", packet);
}
