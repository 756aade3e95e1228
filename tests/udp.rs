use crossbeam_channel::{unbounded, Receiver};
use std::net::UdpSocket;
use std::time::Duration;
use tallystick::prelude::*;
use tallystick::test::UdpServerHarness;
use tallystick::{ClientConfig, StatsdClient, Tag, TagFormat, UdpMetricSink, DEFAULT_PORT};

mod utils;
use utils::{run_arc_threaded_test, NUM_ITERATIONS, NUM_THREADS};

const TARGET_HOST: (&str, u16) = ("127.0.0.1", DEFAULT_PORT);
const WAIT: Duration = Duration::from_millis(500);

fn new_udp_client(prefix: &str) -> StatsdClient {
    let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
    let sink = UdpMetricSink::from(TARGET_HOST, socket).unwrap();
    StatsdClient::from_sink(prefix, sink)
}

/// Run `body` with a server collecting every datagram it receives.
fn with_server<F>(body: F)
where
    F: FnOnce(String, Receiver<String>),
{
    let (tx, rx) = unbounded();
    let harness = UdpServerHarness::new();

    harness.run(
        move |datagram: String| {
            let _ = tx.send(datagram);
        },
        |addr| body(addr.to_string(), rx),
    );
}

#[test]
fn test_statsd_client_udp_sink_single_threaded() {
    let client = new_udp_client("tallystick");
    run_arc_threaded_test(client, 1, 1);
}

#[ignore]
#[test]
fn test_statsd_client_udp_sink_many_threaded() {
    let client = new_udp_client("tallystick");
    run_arc_threaded_test(client, NUM_THREADS, NUM_ITERATIONS);
}

#[test]
fn test_statsd_client_udp_packets_on_the_wire() {
    with_server(|addr, rx| {
        let client = StatsdClient::new(&addr, "test").unwrap();

        client.gauge("gauge", 1, 1.0).unwrap();
        client.inc("count", 1, 0.999999).unwrap();
        client.dec("count", 1, 1.0).unwrap();
        client.timing_duration("timing", Duration::from_micros(1500), 1.0).unwrap();
        client.set("strset", "pickle", 1.0).unwrap();
        client.gauge_delta("gauge", 1, 1.0).unwrap();
        client.gauge_float_delta("gauge", -1.1, 1.0).unwrap();
        client.histogram("histogram", 100.0, 1.0).unwrap();
        client.set_float("floatset", 1.1, 1.0).unwrap();

        let expected = [
            "test.gauge:1|g",
            "test.count:1|c|@0.999999",
            "test.count:-1|c",
            "test.timing:1.5|ms",
            "test.strset:pickle|s",
            "test.gauge:+1|g",
            "test.gauge:-1.1|g",
            "test.histogram:100|h",
            "test.floatset:1.1|s",
        ];

        // loopback does not reorder datagrams from a single socket
        for packet in expected.iter() {
            assert_eq!(*packet, rx.recv_timeout(WAIT).unwrap());
        }
    });
}

#[test]
fn test_statsd_client_udp_tag_dialects() {
    let tags = [Tag::new("tag1", "val1"), Tag::new("tag2", "val2")];
    let cases = [
        (TagFormat::SuffixOctothorpe, "test.count:1|c|#tag1:val1,tag2:val2"),
        (TagFormat::InfixComma, "test.count,tag1=val1,tag2=val2:1|c"),
        (TagFormat::InfixSemicolon, "test.count;tag1=val1;tag2=val2:1|c"),
    ];

    for (tag_format, expected) in cases.iter() {
        with_server(|addr, rx| {
            let config = ClientConfig {
                tag_format: *tag_format,
                ..ClientConfig::new(addr, "test")
            };
            let client = StatsdClient::from_config(&config).unwrap();

            client.inc_with_tags("count", 1, 1.0, &tags).unwrap();

            assert_eq!(*expected, rx.recv_timeout(WAIT).unwrap());
        });
    }
}

#[test]
fn test_statsd_client_udp_resolving() {
    with_server(|addr, rx| {
        let config = ClientConfig {
            resolve_interval: Some(Duration::from_secs(60)),
            ..ClientConfig::new(addr, "")
        };
        let client = StatsdClient::from_config(&config).unwrap();

        client.timing("timing", 7, 1.0).unwrap();

        assert_eq!("timing:7|ms", rx.recv_timeout(WAIT).unwrap());
    });
}

#[test]
fn test_statsd_client_absent_sends_nothing() {
    with_server(|_addr, rx| {
        let client = StatsdClient::absent();

        client.inc("count", 1, 1.0).unwrap();
        client.gauge_with_tags("gauge", 1, 1.0, &[Tag::new("a", "b")]).unwrap();

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    });
}

#[test]
fn test_statsd_client_closed_sends_nothing() {
    with_server(|addr, rx| {
        let mut client = StatsdClient::new(&addr, "test").unwrap();

        client.inc("count", 1, 1.0).unwrap();
        client.close().unwrap();
        client.close().unwrap();
        client.inc("count", 2, 1.0).unwrap();

        assert_eq!("test.count:1|c", rx.recv_timeout(WAIT).unwrap());
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    });
}

#[test]
fn test_statsd_client_sub_statter_shares_socket() {
    with_server(|addr, rx| {
        let client = StatsdClient::new(&addr, "test").unwrap();
        let mut sub = client.sub_statter("sub");

        sub.inc("count", 1, 1.0).unwrap();
        sub.close().unwrap();
        client.inc("count", 1, 1.0).unwrap();

        assert_eq!("test.sub.count:1|c", rx.recv_timeout(WAIT).unwrap());
        assert_eq!("test.count:1|c", rx.recv_timeout(WAIT).unwrap());
        assert_eq!(2, client.stats().packets_sent);
    });
}
