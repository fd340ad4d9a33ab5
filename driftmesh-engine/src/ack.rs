//! The textual, non-bundle ACK wire format.
//!
//! Parsing is non-destructive splitting over a borrowed `&str` view,
//! rather than `strtok`-style in-place mutation.

/// Leading bytes of the literal `"ack"` a receiver checks to classify a
/// frame as an ACK rather than a bundle.
pub const ACK_IDENTIFIER_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub creation_ts0: u32,
    pub creation_ts1: u32,
    pub src_num: u32,
}

pub fn is_ack_frame(bytes: &[u8]) -> bool {
    bytes.len() >= ACK_IDENTIFIER_SIZE && &bytes[..ACK_IDENTIFIER_SIZE] == b"ack"
}

/// Encodes `ack_<ts0>_<ts1>_<src_num>\0`: no trailing newline, a single
/// NUL terminator.
pub fn encode(ack: Ack) -> Vec<u8> {
    let mut s = format!("ack_{}_{}_{}", ack.creation_ts0, ack.creation_ts1, ack.src_num);
    s.push('\0');
    s.into_bytes()
}

/// Strictly parses `ack_<u32>_<u32>_<u32>`, rejecting anything that
/// doesn't match the grammar exactly.
pub fn decode(bytes: &[u8]) -> Option<Ack> {
    let text = std::str::from_utf8(bytes).ok()?;
    let text = text.trim_end_matches('\0');
    let mut parts = text.split('_');

    if parts.next()? != "ack" {
        return None;
    }
    let creation_ts0 = parts.next()?.parse().ok()?;
    let creation_ts1 = parts.next()?.parse().ok()?;
    let src_num = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(Ack { creation_ts0, creation_ts1, src_num })
}
