//! Positioned YAML node tree
//!
//! Documents are built from the marked event stream of `yaml-rust2` so that
//! every node keeps the line and column it was read from. Anchored nodes are
//! copied into each alias.

use std::collections::HashMap;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::error::{ConfigError, Result};
use crate::warning::Mark;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Scalar text; `plain` is false for quoted and block scalars, which are
    /// always strings
    Scalar { value: String, plain: bool },
    Sequence(Vec<Node>),
    Mapping(Vec<Entry>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Node,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub mark: Mark,
}

impl Node {
    pub fn scalar(value: impl Into<String>, plain: bool, mark: Mark) -> Self {
        Self {
            kind: NodeKind::Scalar {
                value: value.into(),
                plain,
            },
            mark,
        }
    }

    pub fn null(mark: Mark) -> Self {
        Self::scalar("~", true, mark)
    }

    pub fn is_null(&self) -> bool {
        match &self.kind {
            NodeKind::Scalar { value, plain: true } => {
                matches!(value.as_str(), "" | "~" | "null" | "Null" | "NULL")
            }
            _ => false,
        }
    }

    /// Whether the node is a scalar that resolves to a string
    pub fn is_string(&self) -> bool {
        match &self.kind {
            NodeKind::Scalar { plain: false, .. } => true,
            NodeKind::Scalar { value, plain: true } => {
                !self.is_null() && resolve_plain(value) == Resolved::Str
            }
            _ => false,
        }
    }

    /// Text of a non-null scalar
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar { value, .. } if !self.is_null() => Some(value),
            _ => None,
        }
    }

    /// Raw scalar text, empty for null and collection nodes
    pub fn scalar_value(&self) -> &str {
        self.as_str().unwrap_or("")
    }

    /// Replace the text of a scalar, keeping its style
    pub fn set_value(&mut self, new_value: impl Into<String>) {
        if let NodeKind::Scalar { value, .. } = &mut self.kind {
            *value = new_value.into();
        }
    }

    /// Look up a mapping entry by key
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        match &self.kind {
            NodeKind::Mapping(entries) => entries.iter().find(|e| e.key.as_str() == Some(key)),
            _ => None,
        }
    }

    /// Human readable node kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            _ if self.is_null() => "null",
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
        }
    }
}

/// Type a plain scalar resolves to under the YAML core schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Resolved {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str,
}

pub(crate) fn resolve_plain(value: &str) -> Resolved {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => return Resolved::Null,
        "true" | "True" | "TRUE" => return Resolved::Bool(true),
        "false" | "False" | "FALSE" => return Resolved::Bool(false),
        _ => {}
    }
    if let Ok(n) = value.parse::<i64>() {
        return Resolved::Int(n);
    }
    if let Ok(n) = value.parse::<u64>() {
        return Resolved::Uint(n);
    }
    match parse_float(value) {
        Some(f) => Resolved::Float(f),
        None => Resolved::Str,
    }
}

fn parse_float(value: &str) -> Option<f64> {
    match value {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        // reject Rust-only spellings such as "inf" or "NaN"
        _ if value.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => value.parse().ok(),
    }
}

/// Load every document of a YAML stream
pub fn load_documents(source: &str) -> Result<Vec<Node>> {
    let mut loader = Loader::default();
    Parser::new(source.chars())
        .load(&mut loader, true)
        .map_err(|err| ConfigError::Syntax {
            message: err.info().to_string(),
            line: err.marker().line(),
            column: err.marker().col() + 1,
        })?;
    Ok(loader.documents)
}

struct Frame {
    node: Node,
    anchor: usize,
    key: Option<Node>,
}

#[derive(Default)]
struct Loader {
    documents: Vec<Node>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Node>,
    root: Option<Node>,
}

impl Loader {
    fn open(&mut self, kind: NodeKind, anchor: usize, mark: Mark) {
        self.stack.push(Frame {
            node: Node { kind, mark },
            anchor,
            key: None,
        });
    }

    fn close(&mut self) {
        if let Some(frame) = self.stack.pop() {
            self.complete(frame.node, frame.anchor);
        }
    }

    fn complete(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        let Some(frame) = self.stack.last_mut() else {
            self.root = Some(node);
            return;
        };
        // block collections are announced at the first key's indicator, so
        // they start where their first child does
        let first = match &frame.node.kind {
            NodeKind::Sequence(items) => items.is_empty(),
            NodeKind::Mapping(entries) => entries.is_empty() && frame.key.is_none(),
            NodeKind::Scalar { .. } => false,
        };
        if first && (node.mark.line, node.mark.column) < (frame.node.mark.line, frame.node.mark.column) {
            frame.node.mark = node.mark;
        }
        match &mut frame.node.kind {
            NodeKind::Sequence(items) => items.push(node),
            NodeKind::Mapping(entries) => match frame.key.take() {
                Some(key) => entries.push(Entry { key, value: node }),
                None => frame.key = Some(node),
            },
            NodeKind::Scalar { .. } => {}
        }
    }
}

impl MarkedEventReceiver for Loader {
    fn on_event(&mut self, event: Event, marker: Marker) {
        let mark = Mark::new(marker.line(), marker.col() + 1);
        match event {
            Event::Scalar(value, style, anchor, ..) => {
                let plain = matches!(style, TScalarStyle::Plain);
                self.complete(Node::scalar(value, plain, mark), anchor);
            }
            Event::SequenceStart(anchor, ..) => self.open(NodeKind::Sequence(Vec::new()), anchor, mark),
            Event::MappingStart(anchor, ..) => self.open(NodeKind::Mapping(Vec::new()), anchor, mark),
            Event::SequenceEnd | Event::MappingEnd => self.close(),
            Event::Alias(id) => {
                // the scanner rejects undefined anchors before they get here
                let mut node = self.anchors.get(&id).cloned().unwrap_or_else(|| Node::null(mark));
                node.mark = mark;
                self.complete(node, 0);
            }
            Event::DocumentEnd => {
                let root = self.root.take().unwrap_or_else(|| Node::null(mark));
                self.documents.push(root);
                self.anchors.clear();
            }
            _ => {}
        }
    }
}
