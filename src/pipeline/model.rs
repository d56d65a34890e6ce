//! Canonical pipeline configuration
//!
//! Every schema generation converts into these types, so the rest of an
//! application never sees which version a file was written in.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Configuration {
    /// Version as declared in the source document
    pub version: String,
    pub pipelines: Vec<Pipeline>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub id: String,
    pub status: String,
    pub name: String,
    pub description: String,
    pub connectors: Vec<Connector>,
    pub processors: Vec<Processor>,
    pub dlq: Dlq,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Connector {
    pub id: String,
    /// `source` or `destination`
    #[serde(rename = "type")]
    pub kind: String,
    pub plugin: String,
    pub name: String,
    pub settings: BTreeMap<String, String>,
    pub processors: Vec<Processor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Processor {
    pub id: String,
    pub plugin: String,
    pub settings: BTreeMap<String, String>,
    pub workers: u32,
    pub condition: String,
}

/// Dead-letter queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dlq {
    pub plugin: String,
    pub settings: BTreeMap<String, String>,
    pub window_size: Option<u32>,
    pub window_nack_threshold: Option<u32>,
}

impl Configuration {
    pub fn pipeline(&self, id: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.id == id)
    }
}
