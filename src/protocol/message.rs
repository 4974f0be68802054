//! Session message parsing
//!
//! Every completed line is classified exactly once. A line containing the
//! seek prefix is a control directive of the form
//! `<prefix><record_index>,<intra_offset>`; anything else is log data.

use crate::types::{RingLogError, RingResult};

/// Prefix tagging an in-band seek directive
pub const DEFAULT_SEEK_PREFIX: &str = "AESDCHAR_IOCSEEKTO:";

/// One classified input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMessage<'a> {
    /// Log content to commit
    Data(&'a [u8]),
    /// Reposition the session's read cursor
    Seek {
        record_index: usize,
        offset: usize,
    },
}

impl<'a> SessionMessage<'a> {
    /// Classify a line, its terminator already stripped.
    ///
    /// Returns `InvalidArgument` when the line carries the seek prefix but
    /// the arguments after it are malformed; such a line is never data.
    pub fn parse(chunk: &'a [u8], prefix: &str) -> RingResult<Self> {
        let prefix = prefix.as_bytes();
        if prefix.is_empty() {
            return Ok(SessionMessage::Data(chunk));
        }
        let start = match find_subslice(chunk, prefix) {
            Some(pos) => pos + prefix.len(),
            None => return Ok(SessionMessage::Data(chunk)),
        };

        let args = std::str::from_utf8(&chunk[start..])
            .map_err(|_| RingLogError::InvalidArgument("seek arguments are not UTF-8".to_string()))?
            .trim();

        let (index, offset) = args.split_once(',').ok_or_else(|| {
            RingLogError::InvalidArgument(format!("expected <index>,<offset>, got {:?}", args))
        })?;

        let record_index = parse_number(index, "record index")?;
        let offset = parse_number(offset, "record offset")?;

        Ok(SessionMessage::Seek {
            record_index,
            offset,
        })
    }

    /// Encode a seek directive line
    pub fn seek_line(prefix: &str, record_index: usize, offset: usize, terminator: u8) -> Vec<u8> {
        let mut line = format!("{}{},{}", prefix, record_index, offset).into_bytes();
        line.push(terminator);
        line
    }

    pub fn is_seek(&self) -> bool {
        matches!(self, SessionMessage::Seek { .. })
    }
}

fn parse_number(text: &str, what: &str) -> RingResult<usize> {
    text.trim()
        .parse::<usize>()
        .map_err(|e| RingLogError::InvalidArgument(format!("bad {} {:?}: {}", what, text, e)))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(chunk: &[u8]) -> RingResult<SessionMessage<'_>> {
        SessionMessage::parse(chunk, DEFAULT_SEEK_PREFIX)
    }

    #[test]
    fn test_plain_data() {
        assert_eq!(parse(b"hello\n").unwrap(), SessionMessage::Data(b"hello\n"));
        assert_eq!(parse(b"").unwrap(), SessionMessage::Data(b""));
    }

    #[test]
    fn test_seek_directive() {
        let msg = parse(b"AESDCHAR_IOCSEEKTO:1,2\n").unwrap();
        assert_eq!(
            msg,
            SessionMessage::Seek {
                record_index: 1,
                offset: 2
            }
        );
        assert!(msg.is_seek());
    }

    #[test]
    fn test_seek_directive_tolerates_whitespace() {
        let msg = parse(b"AESDCHAR_IOCSEEKTO: 3 , 10 \r\n").unwrap();
        assert_eq!(
            msg,
            SessionMessage::Seek {
                record_index: 3,
                offset: 10
            }
        );
    }

    #[test]
    fn test_malformed_seek_is_invalid_argument() {
        for chunk in [
            &b"AESDCHAR_IOCSEEKTO:1\n"[..],
            b"AESDCHAR_IOCSEEKTO:a,2\n",
            b"AESDCHAR_IOCSEEKTO:1,-2\n",
            b"AESDCHAR_IOCSEEKTO:\n",
        ] {
            assert!(
                matches!(parse(chunk), Err(RingLogError::InvalidArgument(_))),
                "{:?}",
                String::from_utf8_lossy(chunk)
            );
        }
    }

    #[test]
    fn test_partial_prefix_is_data() {
        assert!(matches!(
            parse(b"AESDCHAR_IOC\n").unwrap(),
            SessionMessage::Data(_)
        ));
    }

    #[test]
    fn test_seek_line_round_trip() {
        let line = SessionMessage::seek_line(DEFAULT_SEEK_PREFIX, 4, 7, b'\n');
        assert_eq!(line, b"AESDCHAR_IOCSEEKTO:4,7\n");
        assert_eq!(
            parse(&line).unwrap(),
            SessionMessage::Seek {
                record_index: 4,
                offset: 7
            }
        );
    }
}
