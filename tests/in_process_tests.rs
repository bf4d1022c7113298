//! In-process integration tests for the DNS relay.
//!
//! These tests start the relay and a fake upstream on loopback UDP sockets
//! and exchange real datagrams with them.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

use dnsrelay::dns::{run_dns_server, serve, FallbackPolicy, RelaySettings, UdpDnsResolver};
use dnsrelay::error::RelayError;

/// How an upstream fake answers each query it receives
#[derive(Clone, Copy)]
enum UpstreamBehavior {
    /// Echo the query back as a response with no answers
    NoAnswers,
    /// Answer with one A record whose name is a compression pointer
    Answer(Ipv4Addr),
    /// Never reply
    Silent,
}

/// Start a fake upstream resolver and return its address
async fn start_fake_upstream(behavior: UpstreamBehavior) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let (len, from) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(_) => return,
            };
            let query = &buf[..len];

            let reply = match behavior {
                UpstreamBehavior::NoAnswers => {
                    let mut reply = query.to_vec();
                    reply[2] |= 0x80; // QR
                    reply[3] |= 0x80; // RA
                    reply
                }
                UpstreamBehavior::Answer(ip) => {
                    let mut reply = query.to_vec();
                    reply[2] |= 0x80;
                    reply[3] |= 0x80;
                    reply[7] = 1; // ANCOUNT
                    reply.extend_from_slice(&[0xC0, 0x0C]); // name -> question
                    reply.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]); // A IN
                    reply.extend_from_slice(&120u32.to_be_bytes());
                    reply.extend_from_slice(&[0x00, 0x04]);
                    reply.extend_from_slice(&ip.octets());
                    reply
                }
                UpstreamBehavior::Silent => continue,
            };

            let _ = socket.send_to(&reply, from).await;
        }
    });

    (addr, handle)
}

/// Start the relay pointed at `upstream` and return its address
async fn start_test_relay(
    upstream: SocketAddr,
    timeout: Duration,
) -> (SocketAddr, tokio::task::JoinHandle<Result<(), RelayError>>) {
    let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let addr = socket.local_addr().unwrap();

    let settings = RelaySettings {
        upstream,
        timeout,
        fallback: FallbackPolicy::default(),
        enable_logging: false, // Reduce noise in tests
    };
    let resolver = Arc::new(UdpDnsResolver::new(true));

    let handle = tokio::spawn(serve(socket, resolver, Arc::new(settings)));
    (addr, handle)
}

/// Build a simple DNS query for testing
fn build_dns_query(domain: &str, query_id: u16) -> Vec<u8> {
    let mut query = Vec::new();

    // Header
    query.extend_from_slice(&query_id.to_be_bytes()); // ID
    query.extend_from_slice(&[0x01, 0x00]); // Flags: RD=1
    query.extend_from_slice(&[0x00, 0x01]); // QDCOUNT: 1
    query.extend_from_slice(&[0x00, 0x00]); // ANCOUNT: 0
    query.extend_from_slice(&[0x00, 0x00]); // NSCOUNT: 0
    query.extend_from_slice(&[0x00, 0x00]); // ARCOUNT: 0

    // Question
    for label in domain.split('.') {
        query.push(label.len() as u8);
        query.extend_from_slice(label.as_bytes());
    }
    query.push(0x00);
    query.extend_from_slice(&[0x00, 0x01]); // QTYPE: A
    query.extend_from_slice(&[0x00, 0x01]); // QCLASS: IN

    query
}

/// Send a query and wait up to `wait` for the reply
async fn exchange(relay: SocketAddr, query: &[u8], wait: Duration) -> Option<Vec<u8>> {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(query, relay).await.unwrap();

    let mut buf = [0u8; 512];
    match tokio::time::timeout(wait, client.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(buf[..len].to_vec()),
        _ => None,
    }
}

fn answer_count(response: &[u8]) -> u16 {
    u16::from_be_bytes([response[6], response[7]])
}

/// Last four bytes of a single-answer A response are the address
fn last_address(response: &[u8]) -> Ipv4Addr {
    let n = response.len();
    Ipv4Addr::new(response[n - 4], response[n - 3], response[n - 2], response[n - 1])
}

// ============== DNS Relay Tests ==============

#[tokio::test]
async fn test_dns_fallback_when_upstream_has_no_answers() {
    let (upstream, _upstream_handle) = start_fake_upstream(UpstreamBehavior::NoAnswers).await;
    let (relay, relay_handle) = start_test_relay(upstream, Duration::from_secs(2)).await;

    let query = build_dns_query("example.com", 0x1234);
    let response = exchange(relay, &query, Duration::from_secs(3))
        .await
        .expect("relay should answer");

    assert_eq!(&response[0..2], &[0x12, 0x34]); // ID echoed
    assert_eq!(response[2], 0x81); // QR=1, OPCODE=0, RD=1
    assert_eq!(response[3], 0x00); // RA=0, RCODE=0
    assert_eq!(answer_count(&response), 1);

    // Question echoed, then the fallback answer with TTL 0
    let question = &query[12..];
    assert_eq!(&response[12..12 + question.len()], question);
    let answer = &response[12 + question.len()..];
    assert_eq!(&answer[..13], &query[12..25]); // same name
    assert_eq!(&answer[13..17], &[0x00, 0x01, 0x00, 0x01]);
    assert_eq!(&answer[17..21], &[0, 0, 0, 0]);
    assert_eq!(last_address(&response), Ipv4Addr::new(8, 8, 8, 8));

    relay_handle.abort();
}

#[tokio::test]
async fn test_dns_upstream_answer_passthrough() {
    let ip = Ipv4Addr::new(93, 184, 216, 34);
    let (upstream, _upstream_handle) = start_fake_upstream(UpstreamBehavior::Answer(ip)).await;
    let (relay, relay_handle) = start_test_relay(upstream, Duration::from_secs(2)).await;

    let query = build_dns_query("example.com", 0x5151);
    let response = exchange(relay, &query, Duration::from_secs(3))
        .await
        .expect("relay should answer");

    assert_eq!(&response[0..2], &[0x51, 0x51]);
    assert_eq!(answer_count(&response), 1);
    assert_eq!(last_address(&response), ip);

    // The relay re-encodes without compression, so no pointer bytes remain
    let answer = &response[query.len()..];
    assert_eq!(answer[0], 7);
    assert_eq!(&answer[1..8], b"example");

    relay_handle.abort();
}

#[tokio::test]
async fn test_dns_upstream_timeout_drops_query() {
    let (upstream, _upstream_handle) = start_fake_upstream(UpstreamBehavior::Silent).await;
    let (relay, relay_handle) = start_test_relay(upstream, Duration::from_millis(100)).await;

    let query = build_dns_query("example.com", 1);
    let response = exchange(relay, &query, Duration::from_millis(500)).await;
    assert!(response.is_none(), "timed out queries get no reply");

    relay_handle.abort();
}

#[tokio::test]
async fn test_dns_malformed_query() {
    let (upstream, _upstream_handle) = start_fake_upstream(UpstreamBehavior::NoAnswers).await;
    let (relay, relay_handle) = start_test_relay(upstream, Duration::from_secs(2)).await;

    // Send malformed DNS query (too short)
    let response = exchange(relay, &[0x00, 0x01, 0x02], Duration::from_millis(300)).await;
    assert!(response.is_none());

    // Relay keeps serving after a bad datagram
    let query = build_dns_query("example.org", 2);
    assert!(exchange(relay, &query, Duration::from_secs(3)).await.is_some());

    relay_handle.abort();
}

#[tokio::test]
async fn test_dns_nonstandard_opcode_not_implemented() {
    let (upstream, _upstream_handle) = start_fake_upstream(UpstreamBehavior::NoAnswers).await;
    let (relay, relay_handle) = start_test_relay(upstream, Duration::from_secs(2)).await;

    let mut query = build_dns_query("example.com", 3);
    query[2] |= 1 << 3; // OPCODE=1 (IQUERY)

    let response = exchange(relay, &query, Duration::from_secs(3))
        .await
        .expect("relay should answer");
    assert_eq!((response[2] >> 3) & 0x0F, 1);
    assert_eq!(response[3] & 0x0F, 4);

    relay_handle.abort();
}

#[tokio::test]
async fn test_dns_multiple_concurrent_queries() {
    let (upstream, _upstream_handle) = start_fake_upstream(UpstreamBehavior::NoAnswers).await;
    let (relay, relay_handle) = start_test_relay(upstream, Duration::from_secs(2)).await;

    let domains = ["google.com", "example.com", "rust-lang.org", "a.b.c.d"];
    let mut tasks = Vec::new();
    for (i, domain) in domains.iter().enumerate() {
        let query = build_dns_query(domain, 100 + i as u16);
        tasks.push(tokio::spawn(async move {
            exchange(relay, &query, Duration::from_secs(3)).await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let response = task.await.unwrap().expect("relay should answer");
        let id = u16::from_be_bytes([response[0], response[1]]);
        assert_eq!(id, 100 + i as u16);
        assert_eq!(answer_count(&response), 1);
    }

    relay_handle.abort();
}

#[tokio::test]
async fn test_run_dns_server_bind_failure() {
    let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let settings = RelaySettings {
        upstream: "127.0.0.1:53".parse().unwrap(),
        timeout: Duration::from_secs(1),
        fallback: FallbackPolicy::default(),
        enable_logging: false,
    };

    let result = run_dns_server(addr, settings, true).await;
    assert!(matches!(result, Err(RelayError::Io(_))));
}
