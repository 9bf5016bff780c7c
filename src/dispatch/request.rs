//! Client request parsing.
//!
//! A request is a short text message `<type><digit>...`. Only the first two
//! characters (after trimming surrounding ASCII whitespace) are interpreted;
//! whatever follows is carried along untouched. The dispatcher forwards the
//! bytes exactly as received.

use std::fmt;
use thiserror::Error;

/// Kind of content a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `V`
    Video,
    /// `M`
    Music,
    /// `P`
    Picture,
}

impl RequestKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag.to_ascii_uppercase() {
            b'V' => Some(RequestKind::Video),
            b'M' => Some(RequestKind::Music),
            b'P' => Some(RequestKind::Picture),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            RequestKind::Video => 'V',
            RequestKind::Music => 'M',
            RequestKind::Picture => 'P',
        }
    }
}

/// Reasons a client message is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request too short ({0} bytes, need at least 2)")]
    TooShort(usize),

    #[error("duration '{}' is not a decimal digit", as_char(.0))]
    NotADigit(u8),

    #[error("unknown request type '{}'", as_char(.0))]
    UnknownKind(u8),
}

fn as_char(byte: &u8) -> char {
    char::from(*byte)
}

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    /// Requested duration magnitude, 0 through 9.
    pub duration: u8,
    payload: Vec<u8>,
}

impl Request {
    /// Parse the raw bytes of a client message.
    pub fn parse(raw: &[u8]) -> Result<Self, RequestError> {
        let text = raw.trim_ascii();
        if text.len() < 2 {
            return Err(RequestError::TooShort(text.len()));
        }

        let digit = text[1];
        if !digit.is_ascii_digit() {
            return Err(RequestError::NotADigit(digit));
        }

        let kind = RequestKind::from_tag(text[0]).ok_or(RequestError::UnknownKind(text[0]))?;

        Ok(Self {
            kind,
            duration: digit - b'0',
            payload: raw.to_vec(),
        })
    }

    /// The bytes to forward to the backend, identical to what the client sent.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.tag(), self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_type_and_duration() {
        let request = Request::parse(b"V3").unwrap();
        assert_eq!(request.kind, RequestKind::Video);
        assert_eq!(request.duration, 3);
        assert_eq!(request.to_string(), "V3");
    }

    #[test]
    fn test_type_is_case_insensitive() {
        assert_eq!(Request::parse(b"m5").unwrap().kind, RequestKind::Music);
        assert_eq!(Request::parse(b"p0").unwrap().kind, RequestKind::Picture);
    }

    #[test]
    fn test_trailing_bytes_are_ignored_but_forwarded() {
        let request = Request::parse(b"P7 extra\n").unwrap();
        assert_eq!(request.kind, RequestKind::Picture);
        assert_eq!(request.duration, 7);
        assert_eq!(request.payload(), b"P7 extra\n");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let request = Request::parse(b"  M2\r\n").unwrap();
        assert_eq!(request.kind, RequestKind::Music);
        assert_eq!(request.payload(), b"  M2\r\n");
    }

    #[test]
    fn test_short_messages_are_rejected() {
        assert_eq!(Request::parse(b"3"), Err(RequestError::TooShort(1)));
        assert_eq!(Request::parse(b""), Err(RequestError::TooShort(0)));
        assert_eq!(Request::parse(b" V \n"), Err(RequestError::TooShort(1)));
    }

    #[test]
    fn test_non_digit_duration_is_rejected() {
        assert_eq!(Request::parse(b"VX"), Err(RequestError::NotADigit(b'X')));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert_eq!(Request::parse(b"X3"), Err(RequestError::UnknownKind(b'X')));
    }
}
