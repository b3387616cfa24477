use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::error::{Result, TranspileError};
use crate::parser::grammar::{self, Fields};
use crate::parser::types::*;

lazy_static! {
    static ref ADDRESS: Regex = Regex::new(r"^(?:0x)?[0-9a-f]+$").unwrap();
}

/// Marker the front end prints for an empty optional child slot
pub const NULL_RECORD: &str = "<<<NULL>>>";

/// Parse one dump record (tree glyphs already stripped) into a node.
///
/// Returns `Ok(None)` for kinds that carry no semantics, such as `NullStmt`.
pub fn parse(record: &str) -> Result<Option<Node>> {
    let record = record.trim();
    if record == NULL_RECORD {
        return Ok(Some(Node::absent()));
    }

    let (kind, rest) = record.split_once(' ').unwrap_or((record, ""));
    let rule = grammar::lookup(kind).ok_or_else(|| TranspileError::UnrecognizedKind {
        kind: kind.to_string(),
        record: record.to_string(),
    })?;

    let malformed = || TranspileError::MalformedRecord {
        kind: kind.to_string(),
        record: record.to_string(),
        pattern: rule.source().to_string(),
    };

    // The address is always the first field after the kind
    let (address, remainder) = rest.split_once(' ').unwrap_or((rest, ""));
    if !ADDRESS.is_match(address) {
        return Err(malformed());
    }

    let caps = rule.pattern.captures(remainder).ok_or_else(malformed)?;
    let fields = Fields::new(caps);

    let node_kind = match rule.build(&fields) {
        None => {
            trace!(kind, address, "discarding record");
            return Ok(None);
        }
        Some(Ok(node_kind)) => node_kind,
        Some(Err(reason)) => {
            return Err(TranspileError::MalformedRecord {
                kind: kind.to_string(),
                record: record.to_string(),
                pattern: format!("{} ({})", rule.source(), reason),
            })
        }
    };

    trace!(kind, address, "parsed record");
    Ok(Some(Node::new(
        address,
        fields.get("position").map(String::from),
        node_kind,
    )))
}
