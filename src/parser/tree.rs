//! Reconnects the flat record stream into a tree.
//!
//! Nesting is encoded by the glyph prefix in front of each record. The prefix
//! is made of two-character cells: every cell but the last is `"| "` (an
//! ancestor with more siblings below) or `"  "` (an ancestor that was the last
//! child), and the last cell is the connector `"|-"` or `` "`-" ``. The depth
//! of a record is the number of cells; the root has no prefix.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::error::{Result, TranspileError};
use crate::parser::parser::parse;
use crate::parser::types::Node;

lazy_static! {
    static ref ANSI_ESCAPE: Regex = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
    static ref RECORD_START: Regex =
        Regex::new(r"^(?P<prefix>[|` -]*)(?P<body>(?:[A-Za-z_]\w*|<<<NULL>>>).*)$").unwrap();
}

/// One dump record with its nesting depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the dump where the record starts
    pub line: usize,
    pub depth: usize,
    pub text: String,
}

/// Depth encoded by a glyph prefix, or `None` if the prefix is not a shape
/// the front end produces.
pub fn depth_of(prefix: &str) -> Option<usize> {
    if prefix.is_empty() {
        return Some(0);
    }
    if prefix.len() % 2 != 0 {
        return None;
    }

    let cells: Vec<&[u8]> = prefix.as_bytes().chunks(2).collect();
    let (connector, ancestors) = cells.split_last()?;
    if !matches!(*connector, b"|-" | b"`-") {
        return None;
    }
    if !ancestors.iter().all(|cell| matches!(*cell, b"| " | b"  ")) {
        return None;
    }
    Some(cells.len())
}

/// Split raw dump text into depth-annotated records.
///
/// Lines that do not start a record are wrapped continuations of the previous
/// one and are joined onto it.
pub fn split_records(dump: &str) -> Result<Vec<Record>> {
    let clean = ANSI_ESCAPE.replace_all(dump, "");
    let mut records: Vec<Record> = Vec::new();

    for (idx, raw) in clean.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        match RECORD_START.captures(raw) {
            Some(caps) => {
                let prefix = caps.name("prefix").map_or("", |m| m.as_str());
                let body = caps.name("body").map_or("", |m| m.as_str());
                let depth = depth_of(prefix).ok_or_else(|| {
                    TranspileError::tree(
                        line,
                        prefix.len() / 2,
                        format!("unrecognized tree prefix '{}'", prefix),
                    )
                })?;
                records.push(Record {
                    line,
                    depth,
                    text: body.trim_end().to_string(),
                });
            }
            None => match records.last_mut() {
                Some(previous) => {
                    previous.text.push(' ');
                    previous.text.push_str(raw.trim());
                }
                None => {
                    return Err(TranspileError::tree(
                        line,
                        0,
                        format!("continuation line before any record: '{}'", raw.trim()),
                    ))
                }
            },
        }
    }

    Ok(records)
}

/// An open ancestor. Discarded records keep a frame without a node.
#[derive(Debug)]
struct Frame {
    depth: usize,
    line: usize,
    node: Option<Node>,
}

/// Depth-stack tree reconstruction
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<Frame>,
    root_seen: bool,
    records: usize,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a record and attach it under its open ancestor
    pub fn push(&mut self, record: &Record) -> Result<()> {
        let node = parse(&record.text)?;
        self.attach(record.line, record.depth, node)
    }

    /// Attach an already parsed node (`None` for a discarded record) at `depth`
    pub fn attach(&mut self, line: usize, depth: usize, node: Option<Node>) -> Result<()> {
        if depth == 0 && self.root_seen {
            return Err(TranspileError::tree(line, depth, "second root record"));
        }

        while self.stack.last().map_or(false, |frame| frame.depth >= depth) {
            self.close()?;
        }

        match self.stack.last() {
            None if depth != 0 => {
                return Err(TranspileError::tree(
                    line,
                    depth,
                    "record has no open ancestor",
                ))
            }
            Some(parent) if parent.depth + 1 != depth => {
                return Err(TranspileError::tree(
                    line,
                    depth,
                    format!(
                        "depth jumps from {} to {} with no ancestor in between",
                        parent.depth, depth
                    ),
                ))
            }
            Some(parent) if parent.node.is_none() => {
                return Err(TranspileError::tree(
                    line,
                    depth,
                    format!("record nested under discarded record at line {}", parent.line),
                ))
            }
            _ => {}
        }

        if depth == 0 {
            self.root_seen = true;
        }
        trace!(line, depth, open = self.stack.len(), "push frame");
        self.records += 1;
        self.stack.push(Frame { depth, line, node });
        Ok(())
    }

    /// Depths of the currently open ancestors, outermost first
    pub fn open_depths(&self) -> Vec<usize> {
        self.stack.iter().map(|frame| frame.depth).collect()
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Close the innermost frame, handing its node to the parent frame.
    /// Returns the node when it has no parent.
    fn close(&mut self) -> Result<Option<Node>> {
        let Some(frame) = self.stack.pop() else {
            return Ok(None);
        };
        trace!(line = frame.line, depth = frame.depth, "pop frame");

        let Some(node) = frame.node else {
            // A discarded branch or loop body still holds its slot
            if let Some(parent) = self.stack.last_mut().and_then(|p| p.node.as_mut()) {
                if parent.kind.is_control_flow() {
                    parent.add_child(Node::absent());
                }
            }
            return Ok(None);
        };
        match self.stack.last_mut() {
            Some(parent) => match parent.node.as_mut() {
                Some(parent_node) => {
                    parent_node.add_child(node);
                    Ok(None)
                }
                None => Err(TranspileError::tree(
                    frame.line,
                    frame.depth,
                    "record nested under discarded record",
                )),
            },
            None => Ok(Some(node)),
        }
    }

    /// Close every open frame and return the root
    pub fn finish(mut self) -> Result<Node> {
        let mut root = None;
        while !self.stack.is_empty() {
            if let Some(node) = self.close()? {
                root = Some(node);
            }
        }
        root.ok_or_else(|| TranspileError::tree(0, 0, "dump contains no root record"))
    }
}

/// Build the tree for a sequence of depth-annotated records
pub fn build(records: &[Record]) -> Result<Node> {
    let mut builder = TreeBuilder::new();
    for record in records {
        builder.push(record)?;
    }
    builder.finish()
}

/// Split and build in one step
pub fn build_from_dump(dump: &str) -> Result<Node> {
    build(&split_records(dump)?)
}
