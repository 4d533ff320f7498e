//! Catch-all DNS responder for the captive portal.
//!
//! Every A (or ANY) question is answered with the portal address so that
//! phones and laptops open the settings form whatever host they probe.

pub const DNS_PORT: u16 = 53;
pub const ANSWER_TTL_SECS: u32 = 60;

const HEADER_LEN: usize = 12;
const TYPE_A: u16 = 1;
const TYPE_ANY: u16 = 255;
const CLASS_IN: u16 = 1;

const FLAG_RESPONSE: u16 = 0x8000;
const FLAG_AUTHORITATIVE: u16 = 0x0400;
const FLAG_RECURSION_DESIRED: u16 = 0x0100;
const OPCODE_MASK: u16 = 0x7800;
const RCODE_NOT_IMPLEMENTED: u16 = 4;

/// Writes the reply to `query` into `out` and returns its length.
///
/// Returns `None` for packets that are not standard queries or that do not
/// fit; those are dropped without a reply.
pub fn answer(query: &[u8], address: [u8; 4], out: &mut [u8]) -> Option<usize> {
    if query.len() < HEADER_LEN {
        return None;
    }

    let flags = u16::from_be_bytes([query[2], query[3]]);
    let question_count = u16::from_be_bytes([query[4], query[5]]);
    if flags & FLAG_RESPONSE != 0 {
        return None;
    }

    let mut reply_flags = FLAG_RESPONSE | FLAG_AUTHORITATIVE | (flags & FLAG_RECURSION_DESIRED);
    if flags & OPCODE_MASK != 0 || question_count == 0 {
        reply_flags |= (flags & OPCODE_MASK) | RCODE_NOT_IMPLEMENTED;
        return write_header(out, query, reply_flags, 0, 0);
    }

    let question_end = skip_name(query, HEADER_LEN)?.checked_add(4)?;
    if question_end > query.len() {
        return None;
    }
    let qtype = u16::from_be_bytes([query[question_end - 4], query[question_end - 3]]);
    let qclass = u16::from_be_bytes([query[question_end - 2], query[question_end - 1]]);
    let answers = u16::from(matches!(qtype, TYPE_A | TYPE_ANY) && qclass == CLASS_IN);

    let question = &query[HEADER_LEN..question_end];
    let answer_len = if answers == 1 { 16 } else { 0 };
    let total = HEADER_LEN + question.len() + answer_len;
    if out.len() < total {
        return None;
    }

    write_header(out, query, reply_flags, 1, answers)?;
    out[HEADER_LEN..HEADER_LEN + question.len()].copy_from_slice(question);

    if answers == 1 {
        let record = &mut out[HEADER_LEN + question.len()..total];
        // Name is a pointer back to the question name at offset 12.
        record[0..2].copy_from_slice(&0xC00Cu16.to_be_bytes());
        record[2..4].copy_from_slice(&TYPE_A.to_be_bytes());
        record[4..6].copy_from_slice(&CLASS_IN.to_be_bytes());
        record[6..10].copy_from_slice(&ANSWER_TTL_SECS.to_be_bytes());
        record[10..12].copy_from_slice(&4u16.to_be_bytes());
        record[12..16].copy_from_slice(&address);
    }

    Some(total)
}

fn write_header(
    out: &mut [u8],
    query: &[u8],
    flags: u16,
    questions: u16,
    answers: u16,
) -> Option<usize> {
    let header = out.get_mut(..HEADER_LEN)?;
    header[0..2].copy_from_slice(&query[0..2]);
    header[2..4].copy_from_slice(&flags.to_be_bytes());
    header[4..6].copy_from_slice(&questions.to_be_bytes());
    header[6..8].copy_from_slice(&answers.to_be_bytes());
    header[8..12].fill(0);
    Some(HEADER_LEN)
}

/// Offset just past an uncompressed name starting at `offset`.
fn skip_name(packet: &[u8], mut offset: usize) -> Option<usize> {
    loop {
        let len = usize::from(*packet.get(offset)?);
        if len == 0 {
            return Some(offset + 1);
        }
        // Compression pointers and extended labels never appear in questions we answer.
        if len & 0xC0 != 0 {
            return None;
        }
        offset += 1 + len;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    const PORTAL: [u8; 4] = [192, 168, 4, 1];

    fn query(name: &str, qtype: u16) -> Vec<u8> {
        let mut packet = Vec::from([0xAB, 0xCD, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]);
        for label in name.split('.') {
            packet.push(label.len() as u8);
            packet.extend_from_slice(label.as_bytes());
        }
        packet.push(0);
        packet.extend_from_slice(&qtype.to_be_bytes());
        packet.extend_from_slice(&CLASS_IN.to_be_bytes());
        packet
    }

    #[test]
    fn a_query_resolves_to_portal() {
        let query = query("connectivitycheck.gstatic.com", TYPE_A);
        let mut out = [0u8; 512];
        let len = answer(&query, PORTAL, &mut out).unwrap();

        assert_eq!(len, query.len() + 16);
        assert_eq!(&out[0..2], &[0xAB, 0xCD]);
        assert_eq!(u16::from_be_bytes([out[2], out[3]]), 0x8500);
        assert_eq!(&out[6..8], &[0, 1]);
        assert_eq!(&out[12..query.len()], &query[12..]);
        assert_eq!(&out[len - 4..len], &PORTAL);
        assert_eq!(&out[query.len()..query.len() + 2], &[0xC0, 0x0C]);
    }

    #[test]
    fn other_types_get_empty_answer() {
        let query = query("example.com", 28);
        let mut out = [0u8; 512];
        let len = answer(&query, PORTAL, &mut out).unwrap();
        assert_eq!(len, query.len());
        assert_eq!(&out[6..8], &[0, 0]);
    }

    #[test]
    fn drops_responses_and_garbage() {
        let mut out = [0u8; 512];
        let mut response = query("example.com", TYPE_A);
        response[2] |= 0x80;
        assert_eq!(answer(&response, PORTAL, &mut out), None);
        assert_eq!(answer(&[0u8; 5], PORTAL, &mut out), None);

        let mut truncated = query("example.com", TYPE_A);
        truncated.truncate(truncated.len() - 3);
        assert_eq!(answer(&truncated, PORTAL, &mut out), None);
    }

    #[test]
    fn non_query_opcode_is_not_implemented() {
        let mut update = query("example.com", TYPE_A);
        update[2] = 0x28;
        let mut out = [0u8; 512];
        assert_eq!(answer(&update, PORTAL, &mut out), Some(HEADER_LEN));
        assert_eq!(out[3] & 0x0F, 4);
    }

    #[test]
    fn small_buffer_is_refused() {
        let query = query("example.com", TYPE_A);
        let mut out = [0u8; 20];
        assert_eq!(answer(&query, PORTAL, &mut out), None);
    }
}
