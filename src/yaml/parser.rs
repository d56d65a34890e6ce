//! YAML document format and schema parser

use std::io::Read;
use std::marker::PhantomData;

use semver::Version;
use serde::de::DeserializeOwned;
use tracing::trace;

use super::de::from_node;
use super::hooks::{walk, DecoderHook};
use super::node::{load_documents, Node, NodeKind};
use crate::changelog::Changelog;
use crate::error::{ConfigError, Result};
use crate::lint::FieldLinter;
use crate::parser::{DocumentFormat, VersionedConfig, VersionedConfigParser};
use crate::version::{parse_version, Constraint};
use crate::warning::{Mark, Position, Warning, Warnings};

/// Name of the top-level field declaring the document version
pub const VERSION_FIELD: &str = "version";

/// Multi-document YAML streams
///
/// The stream is read into memory once; the version pass and the full
/// decode both work on the loaded documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl DocumentFormat for YamlFormat {
    type Document = Node;

    fn read_documents(&self, reader: &mut dyn Read) -> Result<Vec<Node>> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        let documents = load_documents(&source)?;
        trace!(documents = documents.len(), bytes = source.len(), "loaded YAML stream");
        Ok(documents)
    }

    fn parse_version(&self, document: &Node) -> Result<(Version, Position)> {
        read_version(document)
    }
}

/// Read the top-level `version` field of a document
pub fn read_version(document: &Node) -> Result<(Version, Position)> {
    if document.is_null() {
        return Err(ConfigError::VersionNotSpecified(Position::default()));
    }
    if !matches!(document.kind, NodeKind::Mapping(_)) {
        return Err(ConfigError::Decode {
            message: format!("expected a mapping at the document root, found {}", document.kind_name()),
            line: document.mark.line,
            column: document.mark.column,
        });
    }
    let Some(entry) = document.entry(VERSION_FIELD) else {
        return Err(ConfigError::VersionNotSpecified(Position::default()));
    };

    let position = Position::new(VERSION_FIELD, entry.key.mark, entry.value.scalar_value());
    match &entry.value.kind {
        NodeKind::Scalar { .. } if entry.value.scalar_value().trim().is_empty() => {
            Err(ConfigError::VersionNotSpecified(position))
        }
        NodeKind::Scalar { .. } => Ok((parse_version(entry.value.scalar_value())?, position)),
        _ => Err(ConfigError::Decode {
            message: format!("expected a scalar version, found {}", entry.value.kind_name()),
            line: entry.value.mark.line,
            column: entry.value.mark.column,
        }),
    }
}

/// Schema parser decoding YAML documents into `C`
///
/// While decoding, every field is checked against the changelog and, in
/// strict mode, fields that `C` does not declare are reported as warnings.
pub struct YamlParser<T, C> {
    constraint: Constraint,
    latest_known_version: Version,
    linter: FieldLinter,
    hook: Option<DecoderHook>,
    strict: bool,
    _marker: PhantomData<fn() -> (T, C)>,
}

impl<T, C> YamlParser<T, C> {
    pub fn new(constraint: Constraint, changelog: &Changelog) -> Self {
        Self {
            constraint,
            latest_known_version: changelog
                .latest_version()
                .cloned()
                .unwrap_or_else(|| Version::new(0, 0, 0)),
            linter: FieldLinter::new(changelog),
            hook: None,
            strict: true,
            _marker: PhantomData,
        }
    }

    /// Run `hook` on every node before the changelog lint
    pub fn with_hook(mut self, hook: DecoderHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Report unknown fields as warnings (the default) or ignore them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn linter(&self) -> &FieldLinter {
        &self.linter
    }
}

impl<T, C> VersionedConfigParser<T, Node> for YamlParser<T, C>
where
    C: DeserializeOwned + VersionedConfig<T> + 'static,
{
    fn latest_known_version(&self) -> &Version {
        &self.latest_known_version
    }

    fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    fn parse_versioned_config(
        &self,
        mut document: Node,
        version: &Version,
    ) -> Result<(Box<dyn VersionedConfig<T>>, Warnings)> {
        let mut session = self.linter.session(version);
        let hook = self.hook.as_deref();
        walk(&mut document, &mut |path: &[String], mark: Mark, node: &mut Node| {
            if let Some(hook) = hook {
                hook(path, mark, node);
            }
            if !path.is_empty() {
                session.inspect(path, mark, node.scalar_value());
            }
        });

        let (config, unknown) = from_node::<C>(&document, self.strict)?;

        let mut warnings = session.finish();
        warnings.extend(unknown.into_iter().map(|field| {
            let message = format!("field {} not found in type {}", field.field, field.type_name);
            Warning::new(Position::new(field.field, field.mark, field.value), message)
        }));
        Ok((Box::new(config), warnings))
    }
}
