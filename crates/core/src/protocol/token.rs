//! Byte classes and incremental keyword matching.
//!
//! Recognized header names and list tokens can be split across any number of
//! input fragments, so they are matched one byte at a time against a fixed
//! candidate table instead of being buffered.

/// RFC 7230 `tchar`.
pub const fn is_token(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
        | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// Bytes allowed in a request URL: anything visible, including obs-text.
pub const fn is_url(b: u8) -> bool {
    b > b' ' && b != 0x7f
}

/// Strict header value bytes: HT, visible ASCII, SP and obs-text.
pub const fn is_header_value(b: u8) -> bool {
    b == b'\t' || (b >= b' ' && b != 0x7f)
}

pub const fn is_ows(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

pub const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Case-insensitive prefix matcher over a table of lowercase keywords.
///
/// Each candidate still consistent with the bytes fed so far keeps its bit
/// in `alive`. At most 16 candidates per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Matcher {
    alive: u16,
    len: usize,
}

impl Matcher {
    pub const fn new(table: &[&[u8]]) -> Self {
        let alive = if table.len() >= 16 {
            u16::MAX
        } else {
            (1u16 << table.len()) - 1
        };
        Matcher { alive, len: 0 }
    }

    /// A matcher that can never match, used for unrecognized headers.
    pub const fn dead() -> Self {
        Matcher { alive: 0, len: 0 }
    }

    pub fn feed(&mut self, table: &[&[u8]], b: u8) {
        if self.alive == 0 {
            return;
        }
        let b = b.to_ascii_lowercase();
        for (i, keyword) in table.iter().enumerate() {
            if keyword.get(self.len) != Some(&b) {
                self.alive &= !(1 << i);
            }
        }
        self.len += 1;
    }

    pub fn kill(&mut self) {
        self.alive = 0;
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the keyword matched exactly by everything fed so far.
    pub fn matched(&self, table: &[&[u8]]) -> Option<usize> {
        table
            .iter()
            .enumerate()
            .find(|(i, keyword)| self.alive & (1 << i) != 0 && keyword.len() == self.len)
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[&[u8]] = &[b"close", b"keep-alive", b"upgrade"];

    fn run(input: &[u8]) -> Option<usize> {
        let mut m = Matcher::new(TABLE);
        for &b in input {
            m.feed(TABLE, b);
        }
        m.matched(TABLE)
    }

    #[test]
    fn matches_case_insensitively() {
        assert_eq!(run(b"Close"), Some(0));
        assert_eq!(run(b"KEEP-ALIVE"), Some(1));
        assert_eq!(run(b"upgrade"), Some(2));
    }

    #[test]
    fn prefixes_and_extensions_do_not_match() {
        assert_eq!(run(b"clos"), None);
        assert_eq!(run(b"closed"), None);
        assert_eq!(run(b""), None);
    }

    #[test]
    fn dead_matcher_never_matches() {
        let mut m = Matcher::dead();
        for &b in b"close" {
            m.feed(TABLE, b);
        }
        assert_eq!(m.matched(TABLE), None);
    }

    #[test]
    fn byte_classes() {
        assert!(is_token(b'-'));
        assert!(!is_token(b' '));
        assert!(!is_token(b':'));
        assert!(is_header_value(b'\t'));
        assert!(is_header_value(0x80));
        assert!(!is_header_value(0x01));
        assert!(!is_url(b' '));
        assert_eq!(hex_value(b'F'), Some(15));
        assert_eq!(hex_value(b'g'), None);
    }
}
