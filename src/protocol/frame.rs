//! RESP2 frames

use bytes::Bytes;
use std::fmt;

/// One RESP2 frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// +OK\r\n
    Simple(String),

    /// -ERR message\r\n
    Error(String),

    /// :1000\r\n
    Integer(i64),

    /// $6\r\nfoobar\r\n
    Bulk(Bytes),

    /// $-1\r\n or *-1\r\n
    Null,

    /// *2\r\n...
    Array(Vec<Frame>),
}

impl Frame {
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    pub fn bulk(s: impl Into<String>) -> Self {
        Frame::Bulk(Bytes::from(s.into()))
    }

    /// Integer reply for a yes/no answer
    pub fn flag(yes: bool) -> Self {
        Frame::Integer(i64::from(yes))
    }

    /// Words of a command frame, name first; `None` unless it is an array of
    /// UTF-8 bulk strings
    pub fn into_words(self) -> Option<Vec<String>> {
        match self {
            Frame::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Frame::Bulk(bytes) => String::from_utf8(bytes.to_vec()).ok(),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

/// Framing errors
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Bytes that are not RESP2
    Invalid(String),

    /// Arrays nested deeper than the codec accepts
    TooDeep,

    /// Transport failure
    Io(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Invalid(msg) => write!(f, "invalid frame: {}", msg),
            FrameError::TooDeep => write!(f, "arrays nested too deep"),
            FrameError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_words() {
        let frame = Frame::Array(vec![Frame::bulk("SET"), Frame::bulk("k"), Frame::bulk("v")]);
        assert_eq!(frame.into_words(), Some(vec!["SET".into(), "k".into(), "v".into()]));

        assert_eq!(Frame::Integer(1).into_words(), None);
        assert_eq!(Frame::Array(vec![Frame::Integer(1)]).into_words(), None);
        assert_eq!(Frame::Array(vec![]).into_words(), Some(vec![]));
    }
}
