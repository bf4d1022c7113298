//! Upstream exchange behind a trait, so the server can be driven by a mock.

use crate::error::{DnsError, RelayError};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, warn};

/// Largest datagram accepted from the upstream
pub const MAX_UDP_PAYLOAD: usize = 512;

/// One request/response exchange with an upstream resolver.
pub trait DnsResolver: Send + Sync {
    /// Send `query` to `upstream` and return the raw reply.
    fn resolve(
        &self,
        query: &[u8],
        upstream: SocketAddr,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, DnsError>> + Send;
}

/// Plain UDP resolver: a fresh ephemeral socket per exchange.
pub struct UdpDnsResolver {
    verify_upstream_source: bool,
}

impl UdpDnsResolver {
    pub fn new(verify_upstream_source: bool) -> Self {
        Self {
            verify_upstream_source,
        }
    }

    async fn exchange(&self, query: &[u8], upstream: SocketAddr) -> Result<Vec<u8>, DnsError> {
        // Bind to the upstream's address family
        let bind_addr = if upstream.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| DnsError::UpstreamUnreachable(e.to_string()))?;

        socket
            .send_to(query, upstream)
            .await
            .map_err(|e| DnsError::UpstreamUnreachable(e.to_string()))?;

        let mut response_buf = vec![0u8; MAX_UDP_PAYLOAD];
        let (len, from) = socket
            .recv_from(&mut response_buf)
            .await
            .map_err(|e| DnsError::UpstreamUnreachable(e.to_string()))?;

        if self.verify_upstream_source && from != upstream {
            warn!(
                from = %from,
                expected = %upstream,
                "DNS response from unexpected source (spoofing detected)"
            );
            return Err(DnsError::SpoofingDetected);
        }

        response_buf.truncate(len);
        debug!(upstream = %upstream, bytes = len, "DNS upstream replied");
        Ok(response_buf)
    }
}

impl DnsResolver for UdpDnsResolver {
    async fn resolve(
        &self,
        query: &[u8],
        upstream: SocketAddr,
        timeout: Duration,
    ) -> Result<Vec<u8>, DnsError> {
        // The socket lives inside the exchange future and is dropped on expiry
        match tokio::time::timeout(timeout, self.exchange(query, upstream)).await {
            Ok(result) => result,
            Err(_) => Err(DnsError::UpstreamTimeout),
        }
    }
}

/// Resolve a `host:port` upstream string once, at startup.
pub async fn resolve_upstream(host_port: &str) -> Result<SocketAddr, RelayError> {
    if let Ok(addr) = host_port.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let mut addrs = lookup_host(host_port).await.map_err(|e| {
        RelayError::Config(format!("cannot resolve upstream '{}': {}", host_port, e))
    })?;

    addrs.next().ok_or_else(|| {
        RelayError::Config(format!("upstream '{}' resolved to no addresses", host_port))
    })
}
