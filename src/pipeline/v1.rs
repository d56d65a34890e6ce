//! Pipeline configuration, version 1.x
//!
//! Pipelines, connectors and processors are maps keyed by ID. Map entries
//! are converted in ID order, so the order of processors in the file is
//! lost; version 2 replaces the maps with lists.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::model;
use crate::changelog::{Change, Changelog};
use crate::error::Result;
use crate::parser::VersionedConfig;

const PROCESSOR_ORDER: &str =
    "the order of processors is not preserved in configuration files with version 1.x, please upgrade to version 2.x";

/// Field changes of the 1.x generation
pub fn changelog() -> Result<Changelog> {
    Changelog::new()
        .with_version(
            "1.0",
            vec![
                Change::deprecated("pipelines.*.processors", PROCESSOR_ORDER),
                Change::deprecated("pipelines.*.connectors.*.processors", PROCESSOR_ORDER),
            ],
        )?
        .with_version(
            "1.1",
            vec![Change::introduced(
                "pipelines.*.dead-letter-queue",
                "field dead-letter-queue was introduced in version 1.1, please update the pipeline config version",
            )],
        )
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v1.Configuration")]
pub struct Configuration {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub pipelines: BTreeMap<String, Pipeline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v1.Pipeline")]
pub struct Pipeline {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub connectors: BTreeMap<String, Connector>,
    #[serde(default)]
    pub processors: BTreeMap<String, Processor>,
    #[serde(default, rename = "dead-letter-queue")]
    pub dlq: Dlq,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v1.Connector")]
pub struct Connector {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub processors: BTreeMap<String, Processor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v1.Processor")]
pub struct Processor {
    /// Became `plugin` in the canonical model
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub workers: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v1.DLQ")]
pub struct Dlq {
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default, rename = "window-size")]
    pub window_size: Option<u32>,
    #[serde(default, rename = "window-nack-threshold")]
    pub window_nack_threshold: Option<u32>,
}

impl VersionedConfig<model::Configuration> for Configuration {
    fn to_config(self: Box<Self>) -> Result<model::Configuration> {
        Ok(model::Configuration {
            version: self.version,
            pipelines: self
                .pipelines
                .into_iter()
                .map(|(id, pipeline)| pipeline.into_model(id))
                .collect(),
        })
    }
}

impl Pipeline {
    fn into_model(self, id: String) -> model::Pipeline {
        model::Pipeline {
            id,
            status: self.status,
            name: self.name,
            description: self.description,
            connectors: self
                .connectors
                .into_iter()
                .map(|(id, connector)| connector.into_model(id))
                .collect(),
            processors: processors_into_model(self.processors),
            dlq: self.dlq.into(),
        }
    }
}

impl Connector {
    fn into_model(self, id: String) -> model::Connector {
        model::Connector {
            id,
            kind: self.kind,
            plugin: self.plugin,
            name: self.name,
            settings: self.settings,
            processors: processors_into_model(self.processors),
        }
    }
}

fn processors_into_model(processors: BTreeMap<String, Processor>) -> Vec<model::Processor> {
    processors
        .into_iter()
        .map(|(id, processor)| model::Processor {
            id,
            plugin: processor.kind,
            settings: processor.settings,
            workers: processor.workers,
            condition: String::new(),
        })
        .collect()
}

impl From<Dlq> for model::Dlq {
    fn from(dlq: Dlq) -> Self {
        Self {
            plugin: dlq.plugin,
            settings: dlq.settings,
            window_size: dlq.window_size,
            window_nack_threshold: dlq.window_nack_threshold,
        }
    }
}
