//! Pipeline configuration, version 2.x

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::model;
use crate::changelog::{Change, Changelog};
use crate::error::{ConfigError, Result};
use crate::parser::VersionedConfig;

/// Field changes of the 2.x generation
pub fn changelog() -> Result<Changelog> {
    const CONDITION: &str =
        "field condition was introduced in version 2.1, please update the pipeline config version";
    const PLUGIN: &str = "field plugin was introduced in version 2.2, please update the pipeline config version";
    const TYPE: &str = "please use field 'plugin' (introduced in version 2.2)";

    Changelog::new()
        .with_version("2.0", vec![])?
        .with_version(
            "2.1",
            vec![
                Change::introduced("pipelines.*.processors.*.condition", CONDITION),
                Change::introduced("pipelines.*.connectors.*.processors.*.condition", CONDITION),
            ],
        )?
        .with_version(
            "2.2",
            vec![
                Change::introduced("pipelines.*.processors.*.plugin", PLUGIN),
                Change::introduced("pipelines.*.connectors.*.processors.*.plugin", PLUGIN),
                Change::deprecated("pipelines.*.processors.*.type", TYPE),
                Change::deprecated("pipelines.*.connectors.*.processors.*.type", TYPE),
            ],
        )
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v2.Configuration")]
pub struct Configuration {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v2.Pipeline")]
pub struct Pipeline {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub processors: Vec<Processor>,
    #[serde(default, rename = "dead-letter-queue")]
    pub dlq: Dlq,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v2.Connector")]
pub struct Connector {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub processors: Vec<Processor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v2.Processor")]
pub struct Processor {
    #[serde(default)]
    pub id: String,
    /// Deprecated in 2.2 in favor of `plugin`
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub workers: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "v2.DLQ")]
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
    /// Fails when two pipelines share an ID
    fn to_config(self: Box<Self>) -> Result<model::Configuration> {
        {
            let mut ids = BTreeSet::new();
            if let Some(dup) = self.pipelines.iter().find(|p| !ids.insert(p.id.as_str())) {
                return Err(ConfigError::Conversion(format!("duplicate pipeline id {:?}", dup.id)));
            }
        }

        Ok(model::Configuration {
            version: self.version,
            pipelines: self.pipelines.into_iter().map(Into::into).collect(),
        })
    }
}

impl From<Pipeline> for model::Pipeline {
    fn from(p: Pipeline) -> Self {
        Self {
            id: p.id,
            status: p.status,
            name: p.name,
            description: p.description,
            connectors: p.connectors.into_iter().map(Into::into).collect(),
            processors: p.processors.into_iter().map(Into::into).collect(),
            dlq: p.dlq.into(),
        }
    }
}

impl From<Connector> for model::Connector {
    fn from(c: Connector) -> Self {
        Self {
            id: c.id,
            kind: c.kind,
            plugin: c.plugin,
            name: c.name,
            settings: c.settings,
            processors: c.processors.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Processor> for model::Processor {
    fn from(p: Processor) -> Self {
        let plugin = if p.plugin.is_empty() { p.kind } else { p.plugin };
        Self {
            id: p.id,
            plugin,
            settings: p.settings,
            workers: p.workers,
            condition: p.condition,
        }
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_falls_back_to_type() {
        let legacy: model::Processor = Processor {
            id: "p".to_string(),
            kind: "js".to_string(),
            ..Default::default()
        }
        .into();
        assert_eq!(legacy.plugin, "js");

        let both: model::Processor = Processor {
            kind: "js".to_string(),
            plugin: "builtin:js".to_string(),
            ..Default::default()
        }
        .into();
        assert_eq!(both.plugin, "builtin:js");
    }

    #[test]
    fn test_duplicate_pipeline_id() {
        let pipeline = |id: &str| Pipeline {
            id: id.to_string(),
            ..Default::default()
        };
        let config = Configuration {
            version: "2.0".to_string(),
            pipelines: vec![pipeline("a"), pipeline("b"), pipeline("a")],
        };
        let err = Box::new(config).to_config().unwrap_err();
        assert!(matches!(err, ConfigError::Conversion(msg) if msg == "duplicate pipeline id \"a\""));
    }

    #[test]
    fn test_changelog_latest_version() {
        let changelog = changelog().unwrap();
        assert_eq!(changelog.latest_version().map(|v| v.to_string()), Some("2.2.0".to_string()));
    }
}
