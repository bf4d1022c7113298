//! Domain name encoding and decoding (RFC 1035 §3.1, §4.1.4).
//!
//! Names are handled as dot-joined label strings without a trailing dot; the
//! root name is the empty string. Decoding follows compression pointers
//! against the whole message; encoding never compresses.

use crate::error::DnsError;

/// Maximum wire length of a name, including length octets and the root label
pub const MAX_NAME_LEN: usize = 255;
/// Maximum length of a single label
pub const MAX_LABEL_LEN: usize = 63;
/// Maximum number of compression pointers followed while decoding one name
pub const MAX_POINTER_DEPTH: usize = 32;

const LABEL_TYPE_MASK: u8 = 0xC0;
const LABEL_TYPE_POINTER: u8 = 0xC0;
const LABEL_TYPE_NORMAL: u8 = 0x00;

/// Decode the name starting at `offset` in `message`.
///
/// Returns the name and the number of bytes it occupies at `offset`. A
/// compression pointer counts as two bytes of the current stream; whatever it
/// points at is read from `message` but not counted.
///
/// Every pointer target is remembered, so a chain that comes back to an
/// offset it already read from fails with [`DnsError::PointerCycle`].
pub fn decode_name(message: &[u8], offset: usize) -> Result<(String, usize), DnsError> {
    let mut labels: Vec<&str> = Vec::new();
    let mut visited = vec![offset];
    let mut consumed: Option<usize> = None;
    let mut wire_len = 1; // root label
    let mut pos = offset;

    loop {
        let len = *message.get(pos).ok_or(DnsError::TruncatedName)?;

        match len & LABEL_TYPE_MASK {
            LABEL_TYPE_POINTER => {
                let low = *message.get(pos + 1).ok_or(DnsError::TruncatedName)?;
                if consumed.is_none() {
                    consumed = Some(pos + 2 - offset);
                }

                let target = usize::from(u16::from_be_bytes([len & !LABEL_TYPE_MASK, low]));
                if visited.contains(&target) {
                    return Err(DnsError::PointerCycle);
                }
                // visited[0] is the starting offset, not a pointer target
                if visited.len() > MAX_POINTER_DEPTH {
                    return Err(DnsError::NameTooLong);
                }
                visited.push(target);
                pos = target;
            }
            LABEL_TYPE_NORMAL if len == 0 => {
                // After a backward jump `pos` may sit before `offset`
                let consumed = match consumed {
                    Some(n) => n,
                    None => pos + 1 - offset,
                };
                return Ok((labels.join("."), consumed));
            }
            LABEL_TYPE_NORMAL => {
                let start = pos + 1;
                let end = start + usize::from(len);
                let bytes = message.get(start..end).ok_or(DnsError::TruncatedName)?;

                wire_len += usize::from(len) + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(DnsError::NameTooLong);
                }

                let label = std::str::from_utf8(bytes)
                    .map_err(|_| DnsError::InvalidLabel("label is not valid UTF-8".to_string()))?;
                if label.contains('.') {
                    return Err(DnsError::InvalidLabel(format!(
                        "label {:?} contains a dot",
                        label
                    )));
                }
                labels.push(label);
                pos = end;
            }
            reserved => {
                return Err(DnsError::InvalidLabel(format!(
                    "reserved label type 0x{:02x} at offset {}",
                    reserved, pos
                )));
            }
        }
    }
}

/// Encode `name` as an uncompressed label sequence.
pub fn encode_name(name: &str) -> Result<Vec<u8>, DnsError> {
    let mut buf = Vec::with_capacity(name.len() + 2);
    write_name(&mut buf, name)?;
    Ok(buf)
}

/// Append `name` to `buf` as an uncompressed label sequence.
///
/// A single trailing dot is accepted. On error `buf` may hold part of the name.
pub fn write_name(buf: &mut Vec<u8>, name: &str) -> Result<(), DnsError> {
    let name = name.strip_suffix('.').unwrap_or(name);
    let mut wire_len = 1;

    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() {
                return Err(DnsError::InvalidLabel(format!("empty label in {:?}", name)));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsError::InvalidLabel(format!(
                    "label exceeds {} octets",
                    MAX_LABEL_LEN
                )));
            }

            wire_len += label.len() + 1;
            if wire_len > MAX_NAME_LEN {
                return Err(DnsError::NameTooLong);
            }

            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
    }

    buf.push(0);
    Ok(())
}
