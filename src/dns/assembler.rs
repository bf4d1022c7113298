//! Builds the client-facing response from an upstream reply and the original
//! client query.
//!
//! The upstream reply is used when it carries questions. Otherwise the client
//! query stands in for it. Either way, a source without answers gets one
//! synthesized A record per question.

use crate::dns::header::{Header, ResponseCode, HEADER_SIZE};
use crate::dns::message::{decode_questions, decode_records, DnsMessage, ResourceRecord};
use crate::error::DnsError;
use std::net::Ipv4Addr;

/// TTL of synthesized answers, so clients never cache them
pub const FALLBACK_TTL: u32 = 0;

/// What to answer with when the source message has no answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub address: Ipv4Addr,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            address: Ipv4Addr::new(8, 8, 8, 8),
        }
    }
}

/// Pick the message the response is built from, along with its header.
fn select_source<'a>(
    upstream: &'a [u8],
    client_query: &'a [u8],
) -> Result<(&'a [u8], Header), DnsError> {
    if !upstream.is_empty() {
        let header = Header::decode(upstream)?;
        if header.qdcount > 0 {
            return Ok((upstream, header));
        }
    }

    let header = Header::decode(client_query)?;
    Ok((client_query, header))
}

/// Assemble the outbound message. Any codec error aborts the whole response.
pub fn assemble_response(
    upstream: &[u8],
    client_query: &[u8],
    fallback: &FallbackPolicy,
) -> Result<DnsMessage, DnsError> {
    let (source, src_header) = select_source(upstream, client_query)?;

    let (questions, q_len) = decode_questions(source, HEADER_SIZE, src_header.qdcount)?;

    let answers = if src_header.ancount == 0 {
        questions
            .iter()
            .map(|q| ResourceRecord::a_record(q.name.clone(), FALLBACK_TTL, fallback.address))
            .collect()
    } else {
        decode_records(source, HEADER_SIZE + q_len, src_header.ancount)?.0
    };

    let header = Header {
        id: src_header.id,
        qr: true,
        opcode: src_header.opcode,
        aa: false,
        tc: false,
        rd: src_header.rd,
        ra: false,
        z: 0,
        rcode: ResponseCode::for_opcode(src_header.opcode) as u8,
        qdcount: questions.len() as u16,
        ancount: answers.len() as u16,
        nscount: src_header.nscount,
        arcount: src_header.arcount,
    };

    Ok(DnsMessage {
        header,
        questions,
        answers,
    })
}

/// Assemble and serialize the outbound datagram.
pub fn build_response(
    upstream: &[u8],
    client_query: &[u8],
    fallback: &FallbackPolicy,
) -> Result<Vec<u8>, DnsError> {
    assemble_response(upstream, client_query, fallback)?.to_bytes()
}
