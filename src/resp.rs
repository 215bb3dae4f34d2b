//! The RESP wire codec: an incremental framer that pulls one complete
//! request out of a growing byte buffer, and reply encoders for the six
//! shapes spec.md §4.1 lists.
//!
//! Grounded on the teacher's reply-constant catalogue in `src/obj.rs`
//! (`OK`, `PONG`, `NULL_BULK`, `WRONG_TYPE_ERR`, ...), reworked from
//! pre-rendered `Lazy<Arc<..>>` statics into a plain enum encoded on
//! demand — there is no shared-object pool here to justify pre-rendering.

/// One request: a sequence of binary-safe tokens. The first token is the
/// command name.
pub type Tokens = Vec<Vec<u8>>;

/// Tries to extract one complete request from the front of `buf`.
///
/// Returns `Some((consumed, tokens))` when a full request sits at the
/// start of `buf`; `consumed` is the exact byte count the caller should
/// drop from its buffer. Returns `None` when more bytes are needed —
/// this includes malformed array-form input, per spec.md §4.1: the
/// dispatcher must never see a partial or malformed frame.
pub fn next_request(buf: &[u8]) -> Option<(usize, Tokens)> {
    if buf.is_empty() {
        return None;
    }
    if buf[0] == b'*' {
        parse_array(buf)
    } else {
        parse_inline(buf)
    }
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| from + p)
}

fn parse_array(buf: &[u8]) -> Option<(usize, Tokens)> {
    let crlf = find_crlf(buf, 1)?;
    let count: i64 = std::str::from_utf8(&buf[1..crlf]).ok()?.parse().ok()?;
    if count < 0 {
        // Redis treats *-1 as a null array request; this core has no use
        // for it, so it is simply discarded as a zero-token frame.
        return Some((crlf + 2, Vec::new()));
    }
    let mut pos = crlf + 2;
    // `count` is untrusted and unvalidated at this point (we haven't even
    // confirmed a single bulk header follows) — a client can claim an
    // enormous count in one short frame, so capacity is never
    // preallocated from it. Growing the Vec one confirmed token at a time
    // bounds the allocation by what's actually present in `buf`.
    let mut tokens = Vec::new();
    for _ in 0..count {
        if pos >= buf.len() || buf[pos] != b'$' {
            return None;
        }
        let len_crlf = find_crlf(buf, pos + 1)?;
        let len: i64 = std::str::from_utf8(&buf[pos + 1..len_crlf]).ok()?.parse().ok()?;
        if len < 0 {
            return None;
        }
        let len = len as usize;
        let data_start = len_crlf + 2;
        let data_end = data_start + len;
        if data_end + 2 > buf.len() {
            return None;
        }
        if &buf[data_end..data_end + 2] != b"\r\n" {
            return None;
        }
        tokens.push(buf[data_start..data_end].to_vec());
        pos = data_end + 2;
    }
    Some((pos, tokens))
}

fn parse_inline(buf: &[u8]) -> Option<(usize, Tokens)> {
    let nl = buf.iter().position(|&b| b == b'\n')?;
    let mut line = &buf[..nl];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    let tokens = line
        .split(|&b| b == b' ' || b == b'\t')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_vec())
        .collect();
    Some((nl + 1, tokens))
}

/// One encoded reply. Byte strings are opaque; no UTF-8 assumption is made
/// anywhere in encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Vec<u8>),
    Nil,
    Array(Vec<Reply>),
    /// Produced for an empty input frame: the server sends nothing back.
    None,
}

impl Reply {
    pub fn ok() -> Reply {
        Reply::Simple("OK".to_string())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                out.push(b'+');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Error(s) => {
                out.push(b'-');
                out.extend_from_slice(s.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Integer(n) => {
                out.push(b':');
                out.extend_from_slice(n.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            Reply::Bulk(bytes) => {
                out.push(b'$');
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\r\n");
            }
            Reply::Nil => {
                out.extend_from_slice(b"$-1\r\n");
            }
            Reply::Array(items) => {
                out.push(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.encode_into(out);
                }
            }
            Reply::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_array_request() {
        let buf = b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
        let (consumed, tokens) = next_request(buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(tokens, vec![b"GET".to_vec(), b"foo".to_vec()]);
    }

    #[test]
    fn incomplete_array_waits_for_more_data() {
        let buf = b"*2\r\n$3\r\nGET\r\n$3\r\nfo";
        assert!(next_request(buf).is_none());
    }

    #[test]
    fn malformed_count_waits_forever() {
        let buf = b"*x\r\n";
        assert!(next_request(buf).is_none());
    }

    #[test]
    fn frames_inline_request() {
        let buf = b"PING\n";
        let (consumed, tokens) = next_request(buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(tokens, vec![b"PING".to_vec()]);
    }

    #[test]
    fn inline_request_splits_on_whitespace() {
        let buf = b"SET foo bar\r\n";
        let (consumed, tokens) = next_request(buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(
            tokens,
            vec![b"SET".to_vec(), b"foo".to_vec(), b"bar".to_vec()]
        );
    }

    #[test]
    fn only_consumes_the_first_frame() {
        let buf = b"PING\nPING\n";
        let (consumed, _) = next_request(buf).unwrap();
        assert_eq!(consumed, 5);
    }

    #[test]
    fn encodes_six_reply_shapes() {
        assert_eq!(Reply::Simple("OK".into()).encode(), b"+OK\r\n");
        assert_eq!(Reply::Error("ERR x".into()).encode(), b"-ERR x\r\n");
        assert_eq!(Reply::Integer(42).encode(), b":42\r\n");
        assert_eq!(Reply::Bulk(b"hi".to_vec()).encode(), b"$2\r\nhi\r\n");
        assert_eq!(Reply::Nil.encode(), b"$-1\r\n");
        assert_eq!(
            Reply::Array(vec![Reply::Integer(1), Reply::Integer(2)]).encode(),
            b"*2\r\n:1\r\n:2\r\n"
        );
    }
}
