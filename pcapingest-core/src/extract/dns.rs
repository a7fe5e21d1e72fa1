//! DNS message decoding and `dns_log` records.

use std::borrow::Cow;
use std::net::{Ipv4Addr, Ipv6Addr};

use sha2::{Digest, Sha256};

use crate::error::ExtractionError;
use crate::schema::{tables, IntoRow, Row, TableSchema, Value};

/// Fixed DNS header length.
pub const HEADER_LEN: usize = 12;

/// Compression pointers followed before a name is rejected.
const MAX_POINTER_HOPS: usize = 16;

/// Labels accepted in one name.
const MAX_LABELS: usize = 128;

/// Answer text for record types without a textual rendering.
pub const UNSUPPORTED_ANSWER: &str = "...";

/// DNS record types.
pub mod record_type {
    pub const A: u16 = 1;
    pub const NS: u16 = 2;
    pub const CNAME: u16 = 5;
    pub const SOA: u16 = 6;
    pub const PTR: u16 = 12;
    pub const MX: u16 = 15;
    pub const TXT: u16 = 16;
    pub const AAAA: u16 = 28;
    pub const SRV: u16 = 33;
    pub const ANY: u16 = 255;
}

/// DNS response codes.
pub mod rcode {
    pub const NOERROR: u8 = 0;
    pub const FORMERR: u8 = 1;
    pub const SERVFAIL: u8 = 2;
    pub const NXDOMAIN: u8 = 3;
    pub const NOTIMP: u8 = 4;
    pub const REFUSED: u8 = 5;
}

/// Mnemonic for a query type; unknown values render as their number.
pub fn qtype_name(qtype: u16) -> Cow<'static, str> {
    let name = match qtype {
        1 => "A",
        2 => "NS",
        5 => "CNAME",
        6 => "SOA",
        12 => "PTR",
        15 => "MX",
        16 => "TXT",
        28 => "AAAA",
        33 => "SRV",
        41 => "OPT",
        43 => "DS",
        44 => "SSHFP",
        46 => "RRSIG",
        47 => "NSEC",
        48 => "DNSKEY",
        50 => "NSEC3",
        51 => "NSEC3PARAM",
        52 => "TLSA",
        255 => "ANY",
        257 => "CAA",
        other => return Cow::Owned(other.to_string()),
    };
    Cow::Borrowed(name)
}

/// Mnemonic for a response code.
pub fn rcode_name(rcode: u16) -> Cow<'static, str> {
    let name = match rcode {
        0 => "NOERROR",
        1 => "FORMERR",
        2 => "SERVFAIL",
        3 => "NXDOMAIN",
        4 => "NOTIMP",
        5 => "REFUSED",
        6 => "YXDOMAIN",
        7 => "YXRRSET",
        8 => "NXRRSET",
        9 => "NOTAUTH",
        10 => "NOTZONE",
        16 => "BADVERS",
        other => return Cow::Owned(other.to_string()),
    };
    Cow::Borrowed(name)
}

/// Mnemonic for a query class.
pub fn qclass_name(qclass: u16) -> Cow<'static, str> {
    let name = match qclass {
        1 => "C_INTERNET",
        3 => "C_CHAOS",
        4 => "C_HESIOD",
        254 => "C_NONE",
        255 => "C_ANY",
        other => return Cow::Owned(other.to_string()),
    };
    Cow::Borrowed(name)
}

/// First question of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// One answer-section resource record, rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub name: String,
    pub rtype: u16,
    pub ttl: u32,
    pub data: String,
}

/// Decoded DNS message (header, first question, answer section).
#[derive(Debug, Clone, PartialEq)]
pub struct DnsMessage {
    pub id: u16,
    pub is_response: bool,
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: u8,
    pub rcode: u8,
    pub question: Option<Question>,
    pub answers: Vec<Answer>,
}

impl DnsMessage {
    /// Parse a complete DNS message (no TCP length prefix).
    pub fn parse(msg: &[u8]) -> Result<Self, ExtractionError> {
        if msg.len() < HEADER_LEN {
            return Err(malformed("header too short"));
        }

        let id = u16::from_be_bytes([msg[0], msg[1]]);
        let flags = u16::from_be_bytes([msg[2], msg[3]]);
        let qdcount = u16::from_be_bytes([msg[4], msg[5]]);
        let ancount = u16::from_be_bytes([msg[6], msg[7]]);

        let mut pos = HEADER_LEN;
        let mut question = None;
        for i in 0..qdcount {
            let (name, next) = read_name(msg, pos)?;
            let fixed = msg
                .get(next..next + 4)
                .ok_or_else(|| malformed("question truncated"))?;
            if i == 0 {
                question = Some(Question {
                    name,
                    qtype: u16::from_be_bytes([fixed[0], fixed[1]]),
                    qclass: u16::from_be_bytes([fixed[2], fixed[3]]),
                });
            }
            pos = next + 4;
        }

        let mut answers = Vec::with_capacity(ancount.min(32) as usize);
        for _ in 0..ancount {
            let (answer, next) = read_answer(msg, pos)?;
            answers.push(answer);
            pos = next;
        }

        Ok(Self {
            id,
            is_response: flags & 0x8000 != 0,
            opcode: ((flags >> 11) & 0x0F) as u8,
            authoritative: flags & 0x0400 != 0,
            truncated: flags & 0x0200 != 0,
            recursion_desired: flags & 0x0100 != 0,
            recursion_available: flags & 0x0080 != 0,
            z: ((flags >> 4) & 0x07) as u8,
            rcode: (flags & 0x000F) as u8,
            question,
            answers,
        })
    }

    /// One-line description used as the packet summary.
    pub fn summary(&self) -> String {
        match (&self.question, self.answers.first()) {
            (Some(q), _) if !self.is_response => format!("Standard query {}", q.name),
            (Some(q), _) => format!("Standard query response {}", q.name),
            (None, Some(a)) => format!("Standard query response {}", a.name),
            (None, None) if self.is_response => "Standard query response".to_string(),
            (None, None) => "Standard query".to_string(),
        }
    }
}

fn malformed(reason: &str) -> ExtractionError {
    ExtractionError::Dns {
        reason: reason.to_string(),
    }
}

/// Read a possibly compressed name at `pos`. Returns the dotted name and the
/// offset just past the name in the original position.
fn read_name(msg: &[u8], pos: usize) -> Result<(String, usize), ExtractionError> {
    let mut labels: Vec<String> = Vec::with_capacity(4);
    let mut cursor = pos;
    let mut resume = None;
    let mut hops = 0;

    loop {
        let len = *msg
            .get(cursor)
            .ok_or_else(|| malformed("name runs past end of message"))? as usize;

        match len {
            0 => {
                cursor += 1;
                break;
            }
            l if l & 0xC0 == 0xC0 => {
                let low = *msg
                    .get(cursor + 1)
                    .ok_or_else(|| malformed("truncated compression pointer"))?
                    as usize;
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(malformed("compression pointer loop"));
                }
                resume.get_or_insert(cursor + 2);
                cursor = ((l & 0x3F) << 8) | low;
            }
            l if l > 63 => return Err(malformed("invalid label length")),
            l => {
                let label = msg
                    .get(cursor + 1..cursor + 1 + l)
                    .ok_or_else(|| malformed("label runs past end of message"))?;
                labels.push(String::from_utf8_lossy(label).into_owned());
                if labels.len() > MAX_LABELS {
                    return Err(malformed("too many labels"));
                }
                cursor += 1 + l;
            }
        }
    }

    let name = if labels.is_empty() {
        ".".to_string()
    } else {
        labels.join(".")
    };
    Ok((name, resume.unwrap_or(cursor)))
}

fn read_answer(msg: &[u8], pos: usize) -> Result<(Answer, usize), ExtractionError> {
    let (name, next) = read_name(msg, pos)?;
    let fixed = msg
        .get(next..next + 10)
        .ok_or_else(|| malformed("resource record truncated"))?;
    let rtype = u16::from_be_bytes([fixed[0], fixed[1]]);
    let ttl = u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
    let rdlen = u16::from_be_bytes([fixed[8], fixed[9]]) as usize;

    let start = next + 10;
    let rdata = msg
        .get(start..start + rdlen)
        .ok_or_else(|| malformed("rdata truncated"))?;

    let data = render_rdata(msg, rtype, start, rdata)?;
    Ok((
        Answer {
            name,
            rtype,
            ttl,
            data,
        },
        start + rdlen,
    ))
}

fn render_rdata(
    msg: &[u8],
    rtype: u16,
    start: usize,
    rdata: &[u8],
) -> Result<String, ExtractionError> {
    Ok(match rtype {
        record_type::A if rdata.len() == 4 => {
            Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]).to_string()
        }
        record_type::AAAA if rdata.len() == 16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(rdata);
            Ipv6Addr::from(octets).to_string()
        }
        record_type::CNAME | record_type::NS | record_type::PTR => read_name(msg, start)?.0,
        record_type::MX if rdata.len() > 2 => {
            let preference = u16::from_be_bytes([rdata[0], rdata[1]]);
            format!("{preference} {}", read_name(msg, start + 2)?.0)
        }
        record_type::TXT => {
            let mut parts = Vec::new();
            let mut i = 0;
            while let Some(&len) = rdata.get(i) {
                let end = (i + 1 + len as usize).min(rdata.len());
                parts.push(String::from_utf8_lossy(&rdata[i + 1..end]).into_owned());
                i = end;
            }
            parts.join(" ")
        }
        _ => UNSUPPORTED_ANSWER.to_string(),
    })
}

/// Flow endpoints a DNS record is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsEndpoints {
    pub orig_h: String,
    pub orig_p: u16,
    pub resp_h: String,
    pub resp_p: u16,
    /// "udp" or "tcp"
    pub proto: &'static str,
}

/// Deterministic session id: `C` plus 8 hex digits of a SHA-256 digest.
pub fn session_uid(endpoints: &DnsEndpoints, trans_id: u16, ts_us: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}{}{}{}{}{}",
        endpoints.orig_h, endpoints.orig_p, endpoints.resp_h, endpoints.resp_p, trans_id, ts_us
    ));
    let digest = hasher.finalize();
    format!("C{}", &hex::encode(digest)[..8])
}

/// One `dns_log` row.
#[derive(Debug, Clone, PartialEq)]
pub struct DnsRecord {
    /// Microseconds since the epoch
    pub ts: i64,
    pub uid: String,
    pub id_orig_h: String,
    pub id_orig_p: u16,
    pub id_resp_h: String,
    pub id_resp_p: u16,
    pub proto: String,
    pub trans_id: u16,
    pub query: String,
    pub qclass: u16,
    pub qclass_name: String,
    pub qtype: u16,
    pub qtype_name: String,
    pub rcode: u16,
    pub rcode_name: String,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u16,
    pub answers: Vec<String>,
    pub ttls: Vec<f64>,
    pub rejected: bool,
}

impl DnsRecord {
    /// Build a record from a decoded message.
    pub fn from_message(message: &DnsMessage, endpoints: &DnsEndpoints, ts_us: i64) -> Self {
        let (query, qtype, qclass) = match &message.question {
            Some(q) => (q.name.clone(), q.qtype, q.qclass),
            None => (String::new(), record_type::A, 1),
        };
        let rcode = message.rcode as u16;

        Self {
            ts: ts_us,
            uid: session_uid(endpoints, message.id, ts_us),
            id_orig_h: endpoints.orig_h.clone(),
            id_orig_p: endpoints.orig_p,
            id_resp_h: endpoints.resp_h.clone(),
            id_resp_p: endpoints.resp_p,
            proto: endpoints.proto.to_string(),
            trans_id: message.id,
            query,
            qclass,
            qclass_name: qclass_name(qclass).into_owned(),
            qtype,
            qtype_name: qtype_name(qtype).into_owned(),
            rcode,
            rcode_name: rcode_name(rcode).into_owned(),
            aa: message.authoritative,
            tc: message.truncated,
            rd: message.recursion_desired,
            ra: message.recursion_available,
            z: message.z as u16,
            answers: message.answers.iter().map(|a| a.data.clone()).collect(),
            ttls: message.answers.iter().map(|a| a.ttl as f64).collect(),
            rejected: rcode != 0,
        }
    }

    /// Rebuild a record from a `dns_log` row in column order.
    pub fn from_row(row: &[Value]) -> Option<Self> {
        let mut cells = row.iter();
        let mut next = || cells.next();
        let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
        let num = |v: Option<&Value>| v.and_then(Value::as_u64);
        let flag = |v: Option<&Value>| v.and_then(Value::as_bool);

        Some(Self {
            ts: next()?.as_i64()?,
            uid: text(next())?,
            id_orig_h: text(next())?,
            id_orig_p: num(next())? as u16,
            id_resp_h: text(next())?,
            id_resp_p: num(next())? as u16,
            proto: text(next())?,
            trans_id: num(next())? as u16,
            query: text(next())?,
            qclass: num(next())? as u16,
            qclass_name: text(next())?,
            qtype: num(next())? as u16,
            qtype_name: text(next())?,
            rcode: num(next())? as u16,
            rcode_name: text(next())?,
            aa: flag(next())?,
            tc: flag(next())?,
            rd: flag(next())?,
            ra: flag(next())?,
            z: num(next())? as u16,
            answers: next()?
                .as_list()?
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            ttls: next()?.as_list()?.iter().filter_map(Value::as_f64).collect(),
            rejected: flag(next())?,
        })
    }
}

impl IntoRow for DnsRecord {
    fn table(&self) -> TableSchema {
        tables::DNS_LOG
    }

    fn into_row(self) -> Row {
        vec![
            Value::Timestamp(self.ts),
            self.uid.into(),
            self.id_orig_h.into(),
            self.id_orig_p.into(),
            self.id_resp_h.into(),
            self.id_resp_p.into(),
            self.proto.into(),
            self.trans_id.into(),
            self.query.into(),
            self.qclass.into(),
            self.qclass_name.into(),
            self.qtype.into(),
            self.qtype_name.into(),
            self.rcode.into(),
            self.rcode_name.into(),
            self.aa.into(),
            self.tc.into(),
            self.rd.into(),
            self.ra.into(),
            self.z.into(),
            self.answers.into(),
            self.ttls.into(),
            self.rejected.into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::{encode_name, DnsMessageBuilder};

    fn endpoints() -> DnsEndpoints {
        DnsEndpoints {
            orig_h: "10.0.0.1".into(),
            orig_p: 40000,
            resp_h: "10.0.0.2".into(),
            resp_p: 53,
            proto: "udp",
        }
    }

    #[test]
    fn test_parse_query() {
        let msg = DnsMessageBuilder::query(0xBEEF, "www.example.com", record_type::AAAA).build();
        let parsed = DnsMessage::parse(&msg).unwrap();

        assert_eq!(parsed.id, 0xBEEF);
        assert!(!parsed.is_response);
        assert!(parsed.recursion_desired);
        let q = parsed.question.as_ref().unwrap();
        assert_eq!(q.name, "www.example.com");
        assert_eq!(q.qtype, 28);
        assert_eq!(q.qclass, 1);
        assert_eq!(parsed.summary(), "Standard query www.example.com");
    }

    #[test]
    fn test_parse_response_answers_follow_pointers() {
        let mut cname = Vec::new();
        cname.extend_from_slice(&encode_name("cdn"));
        cname.pop();
        cname.extend_from_slice(&[0xC0, 0x0C]);

        let msg = DnsMessageBuilder::response(7, "example.com", record_type::A, 0)
            .answer(record_type::CNAME, 60, &cname)
            .answer(record_type::A, 300, &[93, 184, 216, 34])
            .answer(record_type::SOA, 10, &[0; 4])
            .build();
        let parsed = DnsMessage::parse(&msg).unwrap();

        let data: Vec<_> = parsed.answers.iter().map(|a| a.data.as_str()).collect();
        assert_eq!(data, ["cdn.example.com", "93.184.216.34", UNSUPPORTED_ANSWER]);
        assert_eq!(parsed.answers[1].name, "example.com");
        assert_eq!(parsed.summary(), "Standard query response example.com");
    }

    #[test]
    fn test_pointer_loop_rejected() {
        let mut msg = vec![0, 1, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0];
        msg.extend_from_slice(&[0xC0, 0x0C]);
        msg.extend_from_slice(&[0, 1, 0, 1]);
        assert!(DnsMessage::parse(&msg).is_err());
    }

    #[test]
    fn test_truncated_question_is_error() {
        let mut msg = DnsMessageBuilder::query(1, "example.com", 1).build();
        msg.truncate(msg.len() - 3);
        assert!(matches!(
            DnsMessage::parse(&msg),
            Err(ExtractionError::Dns { .. })
        ));
        assert!(DnsMessage::parse(&[0; 5]).is_err());
    }

    #[test]
    fn test_txt_and_mx_answers() {
        let mut mx = 10u16.to_be_bytes().to_vec();
        mx.extend_from_slice(&encode_name("mail.example.com"));
        let msg = DnsMessageBuilder::response(2, "example.com", record_type::MX, 0)
            .answer(record_type::MX, 1, &mx)
            .answer(record_type::TXT, 1, b"\x05hello\x05world")
            .build();
        let parsed = DnsMessage::parse(&msg).unwrap();
        assert_eq!(parsed.answers[0].data, "10 mail.example.com");
        assert_eq!(parsed.answers[1].data, "hello world");
    }

    #[test]
    fn test_name_tables() {
        assert_eq!(qtype_name(1), "A");
        assert_eq!(qtype_name(257), "CAA");
        assert_eq!(qtype_name(9999), "9999");
        assert_eq!(rcode_name(3), "NXDOMAIN");
        assert_eq!(rcode_name(12), "12");
        assert_eq!(qclass_name(1), "C_INTERNET");
        assert_eq!(qclass_name(2), "2");
    }

    #[test]
    fn test_record_from_message() {
        let msg = DnsMessageBuilder::response(0x1234, "example.com", record_type::A, rcode::REFUSED as u8)
            .build();
        let parsed = DnsMessage::parse(&msg).unwrap();
        let record = DnsRecord::from_message(&parsed, &endpoints(), 1_700_000_000_000_000);

        assert_eq!(record.query, "example.com");
        assert_eq!(record.rcode_name, "REFUSED");
        assert!(record.rejected);
        assert!(record.ra);
        assert!(record.uid.starts_with('C'));
        assert_eq!(record.uid.len(), 9);
        assert!(record.answers.is_empty());
    }

    #[test]
    fn test_uid_is_deterministic() {
        let a = session_uid(&endpoints(), 5, 1_000);
        let b = session_uid(&endpoints(), 5, 1_000);
        let c = session_uid(&endpoints(), 6, 1_000);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a[1..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_row_matches_table() {
        let msg = DnsMessageBuilder::query(9, "a.b", 1).build();
        let record = DnsRecord::from_message(&DnsMessage::parse(&msg).unwrap(), &endpoints(), 5);
        let row = record.clone().into_row();

        assert_eq!(row.len(), tables::DNS_LOG.columns.len());
        assert_eq!(row[tables::DNS_LOG.index_of("query").unwrap()], Value::from("a.b"));
        assert_eq!(DnsRecord::from_row(&row), Some(record));
    }
}
