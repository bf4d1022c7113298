//! UDP relay loop: one task per inbound datagram.

use crate::dns::assembler::{build_response, FallbackPolicy};
use crate::dns::header::Header;
use crate::dns::resolver::{DnsResolver, UdpDnsResolver, MAX_UDP_PAYLOAD};
use crate::error::{DnsError, RelayError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Immutable per-process state shared by every request task.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub upstream: SocketAddr,
    pub timeout: Duration,
    pub fallback: FallbackPolicy,
    /// Log each query and response at info/debug
    pub enable_logging: bool,
}

/// Bind `listen_addr` and relay queries until the process exits.
pub async fn run_dns_server(
    listen_addr: SocketAddr,
    settings: RelaySettings,
    verify_upstream_source: bool,
) -> Result<(), RelayError> {
    let socket = Arc::new(UdpSocket::bind(listen_addr).await?);
    let resolver = Arc::new(UdpDnsResolver::new(verify_upstream_source));

    info!(
        listen = %socket.local_addr()?,
        upstream = %settings.upstream,
        timeout_ms = settings.timeout.as_millis() as u64,
        fallback = %settings.fallback.address,
        verify_upstream_source = verify_upstream_source,
        "DNS relay started"
    );

    serve(socket, resolver, Arc::new(settings)).await
}

/// Receive loop over an already bound socket.
///
/// Receive errors are logged and the loop continues; nothing a single
/// datagram does can stop the server.
pub async fn serve<R: DnsResolver + 'static>(
    socket: Arc<UdpSocket>,
    resolver: Arc<R>,
    settings: Arc<RelaySettings>,
) -> Result<(), RelayError> {
    loop {
        let mut buf = vec![0u8; MAX_UDP_PAYLOAD];
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "DNS receive failed");
                continue;
            }
        };
        buf.truncate(len);

        if settings.enable_logging {
            debug!(bytes = len, client = %src, "DNS query received");
        }

        let socket_clone = Arc::clone(&socket);
        let resolver_clone = Arc::clone(&resolver);
        let settings_clone = Arc::clone(&settings);

        tokio::spawn(async move {
            match handle_dns_query(&*resolver_clone, &buf, src, &settings_clone).await {
                Ok(response) => {
                    if let Err(e) = socket_clone.send_to(&response, src).await {
                        error!(client = %src, error = %e, "DNS failed to send response");
                    } else if settings_clone.enable_logging {
                        debug!(bytes = response.len(), client = %src, "DNS response sent");
                    }
                }
                Err(e) => {
                    // No reply at all: the client's own timeout handles it
                    warn!(client = %src, error = %e, "DNS query dropped");
                }
            }
        });
    }
}

/// Relay one query and build the client response.
///
/// Public so tests can drive it with a mock resolver.
pub async fn handle_dns_query<R: DnsResolver>(
    resolver: &R,
    query_buf: &[u8],
    client: SocketAddr,
    settings: &RelaySettings,
) -> Result<Vec<u8>, DnsError> {
    let query_header = Header::decode(query_buf)?;

    if settings.enable_logging {
        info!(
            id = query_header.id,
            client = %client,
            opcode = query_header.opcode,
            questions = query_header.qdcount,
            "DNS query"
        );
    }

    let upstream_reply = resolver
        .resolve(query_buf, settings.upstream, settings.timeout)
        .await
        .inspect_err(|e| {
            warn!(upstream = %settings.upstream, error = %e, "DNS upstream failed");
        })?;

    let response = build_response(&upstream_reply, query_buf, &settings.fallback)?;

    if settings.enable_logging {
        if let Ok(header) = Header::decode(&response) {
            debug!(
                id = header.id,
                answers = header.ancount,
                rcode = header.rcode,
                "DNS response assembled"
            );
        }
    }

    Ok(response)
}
