//! Codec errors
//!
//! Every failure the wire layer can report. Application-level failures travel
//! inside response `error_code` fields and never show up here.

use thiserror::Error;

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Value {value} does not fit in {width} bytes")]
    Range { value: String, width: usize },

    #[error("Unsupported integer width: {0} bytes")]
    UnsupportedWidth(usize),

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Truncated input: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("Invalid boolean byte: {0:#04x}")]
    InvalidBool(u8),

    #[error("Malformed list element {index}: {source}")]
    MalformedElement {
        index: usize,
        source: Box<CodecError>,
    },

    #[error("Malformed {message}.{field}: {source}")]
    MalformedField {
        message: &'static str,
        field: &'static str,
        source: Box<CodecError>,
    },

    #[error("Malformed {message}: {trailing} trailing bytes")]
    TrailingBytes {
        message: &'static str,
        trailing: usize,
    },

    #[error("Unknown cluster opcode: {0}")]
    UnknownOpcode(u8),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Coarse classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value does not fit its declared width. Local encoding bug.
    Range,
    /// Fewer bytes than a prefix promised.
    Truncated,
    /// A list element or primitive value failed to decode.
    MalformedElement,
    /// A record field failed to decode, or bytes were left over.
    MalformedMessage,
    /// The opcode is not registered; the peer speaks another protocol version.
    UnknownOpcode,
}

impl CodecError {
    pub(crate) fn range(value: impl ToString, width: usize) -> Self {
        CodecError::Range {
            value: value.to_string(),
            width,
        }
    }

    pub(crate) fn field(message: &'static str, field: &'static str, source: CodecError) -> Self {
        CodecError::MalformedField {
            message,
            field,
            source: Box::new(source),
        }
    }

    pub(crate) fn element(index: usize, source: CodecError) -> Self {
        CodecError::MalformedElement {
            index,
            source: Box::new(source),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Range { .. }
            | CodecError::UnsupportedWidth(_)
            | CodecError::InvalidLength { .. } => ErrorKind::Range,
            CodecError::Truncated { .. } => ErrorKind::Truncated,
            CodecError::InvalidBool(_) | CodecError::MalformedElement { .. } => {
                ErrorKind::MalformedElement
            }
            CodecError::MalformedField { .. } | CodecError::TrailingBytes { .. } => {
                ErrorKind::MalformedMessage
            }
            CodecError::UnknownOpcode(_) => ErrorKind::UnknownOpcode,
        }
    }

    /// Whether running out of input is the root cause
    pub fn is_truncation(&self) -> bool {
        match self {
            CodecError::Truncated { .. } => true,
            CodecError::MalformedElement { source, .. }
            | CodecError::MalformedField { source, .. } => source.is_truncation(),
            _ => false,
        }
    }

    /// Whether the error was produced while reading peer bytes.
    ///
    /// Inbound errors leave the stream position untrustworthy; the connection
    /// carrying the frame must be dropped.
    pub fn is_inbound(&self) -> bool {
        self.kind() != ErrorKind::Range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(CodecError::range(300, 1).kind(), ErrorKind::Range);
        assert_eq!(CodecError::UnknownOpcode(7).kind(), ErrorKind::UnknownOpcode);
        assert_eq!(CodecError::InvalidBool(2).kind(), ErrorKind::MalformedElement);

        let nested = CodecError::field(
            "Ping",
            "id",
            CodecError::Truncated { need: 4, have: 1 },
        );
        assert_eq!(nested.kind(), ErrorKind::MalformedMessage);
        assert!(nested.is_inbound());
        assert!(!CodecError::range(1, 1).is_inbound());
    }

    #[test]
    fn test_truncation_walks_causes() {
        let err = CodecError::field(
            "RootBlock",
            "minor_block_header_list",
            CodecError::element(3, CodecError::Truncated { need: 8, have: 2 }),
        );
        assert!(err.is_truncation());

        let err = CodecError::element(0, CodecError::InvalidBool(9));
        assert!(!err.is_truncation());
    }

    #[test]
    fn test_error_display() {
        let err = CodecError::field("Pong", "id", CodecError::Truncated { need: 4, have: 0 });
        assert_eq!(
            err.to_string(),
            "Malformed Pong.id: Truncated input: need 4 bytes, have 0"
        );
    }
}
