//! Fatal errors raised while turning a dump into Go source.
//!
//! None of these are recoverable: each one means the input holds a construct
//! the transpiler cannot translate faithfully, or the dump itself is broken.

pub type Result<T> = std::result::Result<T, TranspileError>;

#[derive(Debug, thiserror::Error)]
pub enum TranspileError {
    #[error("unrecognized node kind '{kind}' in record: {record}")]
    UnrecognizedKind { kind: String, record: String },

    #[error("malformed {kind} record: could not match pattern '{pattern}' against '{record}'")]
    MalformedRecord {
        kind: String,
        record: String,
        pattern: String,
    },

    #[error("malformed tree at line {line} (depth {depth}): {reason}")]
    MalformedTree {
        line: usize,
        depth: usize,
        reason: String,
    },

    #[error("unsupported {kind} construct: {detail}")]
    UnsupportedConstruct { kind: String, detail: String },
}

impl TranspileError {
    pub(crate) fn unsupported(kind: &str, detail: impl Into<String>) -> Self {
        TranspileError::UnsupportedConstruct {
            kind: kind.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn tree(line: usize, depth: usize, reason: impl Into<String>) -> Self {
        TranspileError::MalformedTree {
            line,
            depth,
            reason: reason.into(),
        }
    }
}
