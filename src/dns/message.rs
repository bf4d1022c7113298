//! Question and resource record sections, and the message that ties them to a
//! header.
//!
//! RDATA is carried as opaque bytes, so names compressed inside it (CNAME, NS,
//! MX targets) are not rewritten when the owner names are re-encoded.

use crate::dns::header::{Header, HEADER_SIZE};
use crate::dns::name::{decode_name, write_name};
use crate::error::DnsError;
use std::net::Ipv4Addr;

// DNS type/class values (RFC 1035 §3.2.2, §3.2.4)
pub const TYPE_A: u16 = 1;
pub const CLASS_IN: u16 = 1;

/// Size of TYPE + CLASS after a question name
const QUESTION_FIXED_LEN: usize = 4;
/// Size of TYPE + CLASS + TTL + RDLENGTH after a record name
const RECORD_FIXED_LEN: usize = 10;

/// Reports a name that runs off the buffer as a truncated section of the
/// given kind; other name errors pass through.
fn truncated_as(section: DnsError) -> impl Fn(DnsError) -> DnsError {
    move |e| match e {
        DnsError::TruncatedName => section.clone(),
        other => other,
    }
}

/// Initial capacity for `count` entries of at least `min_len` bytes each,
/// bounded by what is left of the message.
fn capacity_for(message: &[u8], offset: usize, count: u16, min_len: usize) -> usize {
    usize::from(count).min(message.len().saturating_sub(offset) / min_len)
}

fn read_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([buf[pos], buf[pos + 1]])
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

/// One entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn new(name: impl Into<String>, qtype: u16, qclass: u16) -> Self {
        Self {
            name: name.into(),
            qtype,
            qclass,
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), DnsError> {
        write_name(buf, &self.name)?;
        buf.extend_from_slice(&self.qtype.to_be_bytes());
        buf.extend_from_slice(&self.qclass.to_be_bytes());
        Ok(())
    }
}

/// Decode exactly `count` questions starting at `offset`.
///
/// Returns the questions and the number of bytes they occupy.
pub fn decode_questions(
    message: &[u8],
    offset: usize,
    count: u16,
) -> Result<(Vec<Question>, usize), DnsError> {
    let mut questions =
        Vec::with_capacity(capacity_for(message, offset, count, 1 + QUESTION_FIXED_LEN));
    let mut pos = offset;

    for _ in 0..count {
        let (name, name_len) =
            decode_name(message, pos).map_err(truncated_as(DnsError::TruncatedQuestion))?;
        pos += name_len;

        if message.len() < pos + QUESTION_FIXED_LEN {
            return Err(DnsError::TruncatedQuestion);
        }
        questions.push(Question {
            name,
            qtype: read_u16(message, pos),
            qclass: read_u16(message, pos + 2),
        });
        pos += QUESTION_FIXED_LEN;
    }

    Ok((questions, pos - offset))
}

/// One entry of the answer section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdlength: u16,
    pub rdata: Vec<u8>,
}

impl ResourceRecord {
    /// An A/IN record pointing `name` at `addr`.
    pub fn a_record(name: impl Into<String>, ttl: u32, addr: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            rtype: TYPE_A,
            class: CLASS_IN,
            ttl,
            rdlength: 4,
            rdata: addr.octets().to_vec(),
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), DnsError> {
        if usize::from(self.rdlength) != self.rdata.len() {
            return Err(DnsError::InconsistentRdLength {
                declared: self.rdlength,
                actual: self.rdata.len(),
            });
        }

        write_name(buf, &self.name)?;
        buf.extend_from_slice(&self.rtype.to_be_bytes());
        buf.extend_from_slice(&self.class.to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());
        buf.extend_from_slice(&self.rdlength.to_be_bytes());
        buf.extend_from_slice(&self.rdata);
        Ok(())
    }
}

#[cfg(test)]
impl ResourceRecord {
    /// The address carried by an A/IN record, if this is one.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        if self.rtype != TYPE_A || self.class != CLASS_IN {
            return None;
        }
        let octets: [u8; 4] = self.rdata.as_slice().try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }
}

/// Decode exactly `count` resource records starting at `offset`.
///
/// Returns the records and the number of bytes they occupy.
pub fn decode_records(
    message: &[u8],
    offset: usize,
    count: u16,
) -> Result<(Vec<ResourceRecord>, usize), DnsError> {
    let mut records =
        Vec::with_capacity(capacity_for(message, offset, count, 1 + RECORD_FIXED_LEN));
    let mut pos = offset;

    for _ in 0..count {
        let (name, name_len) =
            decode_name(message, pos).map_err(truncated_as(DnsError::TruncatedRecord))?;
        pos += name_len;

        if message.len() < pos + RECORD_FIXED_LEN {
            return Err(DnsError::TruncatedRecord);
        }
        let rtype = read_u16(message, pos);
        let class = read_u16(message, pos + 2);
        let ttl = read_u32(message, pos + 4);
        let rdlength = read_u16(message, pos + 8);
        pos += RECORD_FIXED_LEN;

        let rdata = message
            .get(pos..pos + usize::from(rdlength))
            .ok_or(DnsError::TruncatedRecord)?
            .to_vec();
        pos += usize::from(rdlength);

        records.push(ResourceRecord {
            name,
            rtype,
            class,
            ttl,
            rdlength,
            rdata,
        });
    }

    Ok((records, pos - offset))
}

/// A header with its question and answer sections.
///
/// Authority and additional sections are not modelled; their counts ride
/// along in the header untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
}

impl DnsMessage {
    /// Decode the header, then QDCOUNT questions and ANCOUNT answers.
    pub fn parse(buf: &[u8]) -> Result<DnsMessage, DnsError> {
        let header = Header::decode(buf)?;
        let (questions, q_len) = decode_questions(buf, HEADER_SIZE, header.qdcount)?;
        let (answers, _) = decode_records(buf, HEADER_SIZE + q_len, header.ancount)?;

        Ok(DnsMessage {
            header,
            questions,
            answers,
        })
    }

    /// Serialize header, questions and answers.
    ///
    /// QDCOUNT and ANCOUNT are taken from the section lengths, not from
    /// whatever the header field holds.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsError> {
        let header = Header {
            qdcount: self.questions.len() as u16,
            ancount: self.answers.len() as u16,
            ..self.header
        };

        let mut buf = Vec::with_capacity(512);
        buf.extend_from_slice(&header.encode());
        for question in &self.questions {
            question.encode_into(&mut buf)?;
        }
        for answer in &self.answers {
            answer.encode_into(&mut buf)?;
        }
        Ok(buf)
    }
}
