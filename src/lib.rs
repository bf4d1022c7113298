//! dnsrelay - a minimal DNS forwarding resolver library.
//!
//! The wire codec and response assembly live in [`dns`]; the binary wires
//! them to a UDP socket using [`config`] and [`logging`].

pub mod config;
pub mod dns;
pub mod error;
pub mod logging;
