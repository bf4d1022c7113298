//! DNS message header (RFC 1035 §4.1.1).
//!
//! ```text
//!   byte 2: |QR|   OPCODE  |AA|TC|RD|
//!   byte 3: |RA|   Z    |   RCODE   |
//! ```

use crate::error::DnsError;

pub const HEADER_SIZE: usize = 12;

const OPCODE_MASK: u8 = 0x0F;
const Z_MASK: u8 = 0x07;
const RCODE_MASK: u8 = 0x0F;

/// Response codes the relay emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError = 0,
    NotImp = 4,
}

impl ResponseCode {
    /// Response code for a query with the given opcode: only standard
    /// queries (opcode 0) are implemented.
    pub fn for_opcode(opcode: u8) -> Self {
        if opcode & OPCODE_MASK == 0 {
            ResponseCode::NoError
        } else {
            ResponseCode::NotImp
        }
    }
}

/// Unpacked 12-byte header. Single-bit flags are `bool`; multi-bit fields
/// keep their raw value and are masked to width on encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    /// Decode the header from the first 12 bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Header, DnsError> {
        if buf.len() < HEADER_SIZE {
            return Err(DnsError::MalformedHeader);
        }

        let flags_hi = buf[2];
        let flags_lo = buf[3];

        Ok(Header {
            id: u16::from_be_bytes([buf[0], buf[1]]),
            qr: flags_hi & 0x80 != 0,
            opcode: (flags_hi >> 3) & OPCODE_MASK,
            aa: flags_hi & 0x04 != 0,
            tc: flags_hi & 0x02 != 0,
            rd: flags_hi & 0x01 != 0,
            ra: flags_lo & 0x80 != 0,
            z: (flags_lo >> 4) & Z_MASK,
            rcode: flags_lo & RCODE_MASK,
            qdcount: u16::from_be_bytes([buf[4], buf[5]]),
            ancount: u16::from_be_bytes([buf[6], buf[7]]),
            nscount: u16::from_be_bytes([buf[8], buf[9]]),
            arcount: u16::from_be_bytes([buf[10], buf[11]]),
        })
    }

    /// Pack the header into wire format.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];

        out[0..2].copy_from_slice(&self.id.to_be_bytes());
        out[2] = (self.qr as u8) << 7
            | (self.opcode & OPCODE_MASK) << 3
            | (self.aa as u8) << 2
            | (self.tc as u8) << 1
            | self.rd as u8;
        out[3] = (self.ra as u8) << 7 | (self.z & Z_MASK) << 4 | (self.rcode & RCODE_MASK);
        out[4..6].copy_from_slice(&self.qdcount.to_be_bytes());
        out[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        out[8..10].copy_from_slice(&self.nscount.to_be_bytes());
        out[10..12].copy_from_slice(&self.arcount.to_be_bytes());

        out
    }
}
