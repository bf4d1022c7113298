//! Error types for the relay and its wire codec.

use std::fmt;
use std::io;

/// Process-level error: anything that stops the relay from starting or running.
#[derive(Debug)]
pub enum RelayError {
    /// IO error (socket bind, config file)
    Io(io::Error),
    /// Configuration error
    Config(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Io(e) => write!(f, "IO error: {}", e),
            RelayError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Io(e) => Some(e),
            RelayError::Config(_) => None,
        }
    }
}

impl From<io::Error> for RelayError {
    fn from(err: io::Error) -> Self {
        RelayError::Io(err)
    }
}

/// Errors local to one datagram. None of them are fatal to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// Buffer shorter than the 12-byte header
    MalformedHeader,
    /// A name runs past the end of the message
    TruncatedName,
    /// Question section shorter than QDCOUNT says
    TruncatedQuestion,
    /// Answer section shorter than ANCOUNT or RDLENGTH says
    TruncatedRecord,
    /// Compression pointer chain revisits an offset
    PointerCycle,
    /// Name exceeds 255 octets or the pointer depth limit
    NameTooLong,
    /// Reserved label type, bad label bytes, or an unencodable label
    InvalidLabel(String),
    /// RDLENGTH disagrees with the RDATA length at encode time
    InconsistentRdLength { declared: u16, actual: usize },
    /// Upstream could not be contacted
    UpstreamUnreachable(String),
    /// Upstream did not answer in time
    UpstreamTimeout,
    /// Reply came from an address other than the upstream
    SpoofingDetected,
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsError::MalformedHeader => write!(f, "DNS message shorter than header"),
            DnsError::TruncatedName => write!(f, "DNS name extends beyond message"),
            DnsError::TruncatedQuestion => write!(f, "DNS question section truncated"),
            DnsError::TruncatedRecord => write!(f, "DNS resource record truncated"),
            DnsError::PointerCycle => write!(f, "DNS compression pointer cycle"),
            DnsError::NameTooLong => write!(f, "DNS name too long"),
            DnsError::InvalidLabel(reason) => write!(f, "DNS invalid label: {}", reason),
            DnsError::InconsistentRdLength { declared, actual } => write!(
                f,
                "DNS rdlength {} does not match rdata length {}",
                declared, actual
            ),
            DnsError::UpstreamUnreachable(msg) => write!(f, "DNS upstream unreachable: {}", msg),
            DnsError::UpstreamTimeout => write!(f, "DNS upstream timeout"),
            DnsError::SpoofingDetected => write!(f, "DNS response spoofing detected"),
        }
    }
}

impl std::error::Error for DnsError {}
