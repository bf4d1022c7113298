//! DNS wire codec, response assembly and the UDP relay server.

pub mod assembler;
pub mod header;
pub mod message;
pub mod name;
pub mod resolver;
mod server;

pub use assembler::{assemble_response, build_response, FallbackPolicy};
pub use header::Header;
pub use message::{DnsMessage, Question, ResourceRecord};
pub use resolver::{resolve_upstream, DnsResolver, UdpDnsResolver};
pub use server::{handle_dns_query, run_dns_server, serve, RelaySettings};
