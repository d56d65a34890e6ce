//! Version dispatch across schema generations
//!
//! A [`Parser`] owns one [`VersionedConfigParser`] per supported schema
//! generation. For every document in the input stream it reads the declared
//! version, picks the parser whose constraint accepts it, decodes the
//! document and converts the result into the canonical output type.

use std::io::Read;

use semver::Version;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::version::{latest_version, Constraint};
use crate::warning::{Position, Warning, Warnings};

/// A decoded document in the shape of one schema generation
pub trait VersionedConfig<T> {
    /// Convert into the canonical configuration type
    fn to_config(self: Box<Self>) -> Result<T>;
}

/// Splits an input stream into documents and reads their declared version
pub trait DocumentFormat: Send + Sync {
    type Document;

    /// Read every document of the stream
    fn read_documents(&self, reader: &mut dyn Read) -> Result<Vec<Self::Document>>;

    /// Read only the declared version of a document
    ///
    /// Fails with [`ConfigError::VersionNotSpecified`] when the document has
    /// no (or an empty) version field.
    fn parse_version(&self, document: &Self::Document) -> Result<(Version, Position)>;
}

/// Decoder for one schema generation
pub trait VersionedConfigParser<T, D>: Send + Sync {
    /// Greatest version covered by this parser's changelog
    fn latest_known_version(&self) -> &Version;

    /// Versions this parser is eligible for
    fn constraint(&self) -> &Constraint;

    /// Decode `document`, linting it against `version`
    fn parse_versioned_config(
        &self,
        document: D,
        version: &Version,
    ) -> Result<(Box<dyn VersionedConfig<T>>, Warnings)>;
}

type BoxedParser<T, D> = Box<dyn VersionedConfigParser<T, D>>;

/// Dispatching parser over several schema generations
///
/// The parser is immutable once built and can be shared between threads;
/// each call to [`Parser::parse`] owns its buffers and warnings.
pub struct Parser<T, F: DocumentFormat> {
    format: F,
    parsers: Vec<BoxedParser<T, F::Document>>,
    latest_version: Version,
}

impl<T, F: DocumentFormat> Parser<T, F> {
    pub fn new(format: F, parsers: Vec<BoxedParser<T, F::Document>>) -> Self {
        let latest_version = latest_version(parsers.iter().map(|p| p.latest_known_version()))
            .cloned()
            .unwrap_or_else(|| Version::new(0, 0, 0));
        Self {
            format,
            parsers,
            latest_version,
        }
    }

    /// Append a schema parser, consulted after the ones already registered
    pub fn with_parser(mut self, parser: impl VersionedConfigParser<T, F::Document> + 'static) -> Self {
        if parser.latest_known_version() > &self.latest_version {
            self.latest_version = parser.latest_known_version().clone();
        }
        self.parsers.push(Box::new(parser));
        self
    }

    /// Latest version known to any registered parser
    pub fn latest_version(&self) -> &Version {
        &self.latest_version
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    /// Parse every document of `reader`
    ///
    /// Returns one configuration per document in input order. Warnings of
    /// each document are kept together, sorted by line. Any error aborts the
    /// whole stream.
    pub fn parse<R: Read>(&self, mut reader: R) -> Result<(Vec<T>, Warnings)> {
        let documents = self.format.read_documents(&mut reader)?;

        let mut configs = Vec::with_capacity(documents.len());
        let mut warnings = Warnings::new();
        for document in documents {
            let (version, mut doc_warnings) = self.parse_version(&document)?;

            let (parser, perfect_match) = self
                .find_versioned_config_parser(&version)
                .ok_or_else(|| ConfigError::UnsupportedVersion(version.clone()))?;
            debug!(
                %version,
                constraint = %parser.constraint(),
                perfect_match,
                "selected versioned config parser"
            );
            if !perfect_match {
                doc_warnings.push(Warning::unpositioned(format!(
                    "no parser found for version {}, using parser for version {} with constraint {}",
                    version,
                    parser.latest_known_version(),
                    parser.constraint(),
                )));
            }

            let (config, parsed_warnings) = parser.parse_versioned_config(document, &version)?;
            doc_warnings.extend(parsed_warnings);
            doc_warnings.sort();
            debug!(%version, warnings = doc_warnings.len(), "parsed document");

            configs.push(config.to_config()?);
            warnings.extend(doc_warnings);
        }

        Ok((configs, warnings))
    }

    /// Read the declared version, falling back to the latest known version
    fn parse_version(&self, document: &F::Document) -> Result<(Version, Warnings)> {
        match self.format.parse_version(document) {
            Ok((version, _)) => Ok((version, Warnings::new())),
            Err(ConfigError::VersionNotSpecified(position)) => {
                let warning = Warning::new(
                    position,
                    format!(
                        "no version defined, falling back to parser version {}",
                        self.latest_version
                    ),
                );
                Ok((self.latest_version.clone(), vec![warning].into()))
            }
            Err(err) => Err(err),
        }
    }

    /// Find the parser for `version`
    ///
    /// The first eligible parser whose latest known version covers `version`
    /// is a perfect match. Otherwise the eligible parser with the greatest
    /// latest known version is returned as a best match.
    fn find_versioned_config_parser(
        &self,
        version: &Version,
    ) -> Option<(&dyn VersionedConfigParser<T, F::Document>, bool)> {
        let mut best_match: Option<&dyn VersionedConfigParser<T, F::Document>> = None;
        for parser in self.parsers.iter().map(|parser| &**parser) {
            if !parser.constraint().matches(version) {
                continue;
            }
            if parser.latest_known_version() >= version {
                return Some((parser, true));
            }
            if best_match.map_or(true, |best| best.latest_known_version() < parser.latest_known_version()) {
                best_match = Some(parser);
            }
        }
        best_match.map(|parser| (parser, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;

    /// Documents are lines of `version;line:field,...`
    struct LineFormat;

    struct LineDoc {
        version: String,
        fields: Vec<(usize, String)>,
    }

    impl DocumentFormat for LineFormat {
        type Document = LineDoc;

        fn read_documents(&self, reader: &mut dyn Read) -> Result<Vec<LineDoc>> {
            let mut input = String::new();
            reader.read_to_string(&mut input)?;
            Ok(input
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|line| {
                    let (version, fields) = line.split_once(';').unwrap_or((line, ""));
                    LineDoc {
                        version: version.trim().to_string(),
                        fields: fields
                            .split(',')
                            .filter_map(|f| f.split_once(':'))
                            .map(|(l, f)| (l.parse().unwrap(), f.to_string()))
                            .collect(),
                    }
                })
                .collect())
        }

        fn parse_version(&self, document: &LineDoc) -> Result<(Version, Position)> {
            if document.version.is_empty() {
                return Err(ConfigError::VersionNotSpecified(Position::default()));
            }
            Ok((parse_version(&document.version)?, Position::default()))
        }
    }

    struct Echo(String);

    impl VersionedConfig<String> for Echo {
        fn to_config(self: Box<Self>) -> Result<String> {
            Ok(self.0)
        }
    }

    struct EchoParser {
        name: &'static str,
        constraint: Constraint,
        latest: Version,
    }

    impl EchoParser {
        fn new(name: &'static str, constraint: &str, latest: &str) -> Self {
            Self {
                name,
                constraint: Constraint::parse(constraint).unwrap(),
                latest: parse_version(latest).unwrap(),
            }
        }
    }

    impl VersionedConfigParser<String, LineDoc> for EchoParser {
        fn latest_known_version(&self) -> &Version {
            &self.latest
        }

        fn constraint(&self) -> &Constraint {
            &self.constraint
        }

        fn parse_versioned_config(
            &self,
            document: LineDoc,
            version: &Version,
        ) -> Result<(Box<dyn VersionedConfig<String>>, Warnings)> {
            let mut warnings = Warnings::new();
            for (line, field) in document.fields {
                if field == "bad" {
                    return Err(ConfigError::Decode {
                        message: "bad field".to_string(),
                        line,
                        column: 1,
                    });
                }
                warnings.push(Warning::new(
                    Position {
                        field: field.clone(),
                        line,
                        ..Default::default()
                    },
                    format!("unknown field {field}"),
                ));
            }
            Ok((Box::new(Echo(format!("{}@{}", self.name, version))), warnings))
        }
    }

    fn parser() -> Parser<String, LineFormat> {
        let parsers: Vec<BoxedParser<String, LineDoc>> = vec![
            Box::new(EchoParser::new("v1", "^1", "1.1")),
            Box::new(EchoParser::new("v2", "^2", "2.2")),
        ];
        Parser::new(LineFormat, parsers)
    }

    fn messages(warnings: &Warnings) -> Vec<&str> {
        warnings.iter().map(|w| w.message.as_str()).collect()
    }

    #[test]
    fn test_latest_version_across_parsers() {
        assert_eq!(parser().latest_version(), &Version::new(2, 2, 0));
    }

    #[test]
    fn test_perfect_match() {
        let (configs, warnings) = parser().parse("1.0\n2.1\n".as_bytes()).unwrap();
        assert_eq!(configs, vec!["v1@1.0.0", "v2@2.1.0"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_best_match_emits_single_warning() {
        let (configs, warnings) = parser().parse("1.12".as_bytes()).unwrap();
        assert_eq!(configs, vec!["v1@1.12.0"]);
        assert_eq!(
            messages(&warnings),
            vec!["no parser found for version 1.12.0, using parser for version 1.1.0 with constraint ^1"]
        );
    }

    #[test]
    fn test_best_match_prefers_most_recent_parser() {
        let parser = parser()
            .with_parser(EchoParser::new("v1-late", "^1", "1.4"))
            .with_parser(EchoParser::new("v1-mid", "^1", "1.3"));
        let (configs, _) = parser.parse("1.9".as_bytes()).unwrap();
        assert_eq!(configs, vec!["v1-late@1.9.0"]);

        // a covering parser wins even if registered after a best match
        let (configs, warnings) = parser.parse("1.2".as_bytes()).unwrap();
        assert_eq!(configs, vec!["v1-late@1.2.0"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unsupported_version() {
        let err = parser().parse("3.0".as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion(v) if v == Version::new(3, 0, 0)));
    }

    #[test]
    fn test_missing_version_falls_back_to_latest() {
        let (configs, warnings) = parser().parse(";4:extra".as_bytes()).unwrap();
        assert_eq!(configs, vec!["v2@2.2.0"]);
        assert_eq!(
            messages(&warnings),
            vec!["no version defined, falling back to parser version 2.2.0", "unknown field extra"]
        );
        assert_eq!(warnings[0].position, Position::default());
    }

    #[test]
    fn test_invalid_version_is_fatal() {
        let err = parser().parse("1.0\nnope\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::VersionParse { .. }));
    }

    #[test]
    fn test_document_warnings_sorted_and_grouped() {
        let (_, warnings) = parser()
            .parse("1.0;9:c,2:a,5:b\n1.12;7:e,3:d\n".as_bytes())
            .unwrap();
        assert_eq!(
            messages(&warnings),
            vec![
                "unknown field a",
                "unknown field b",
                "unknown field c",
                "no parser found for version 1.12.0, using parser for version 1.1.0 with constraint ^1",
                "unknown field d",
                "unknown field e",
            ]
        );
    }

    #[test]
    fn test_decode_error_aborts_stream() {
        let err = parser().parse("1.0;1:a\n2.0;3:bad\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { line: 3, .. }));
    }

    #[test]
    fn test_empty_stream() {
        let (configs, warnings) = parser().parse("".as_bytes()).unwrap();
        assert!(configs.is_empty());
        assert!(warnings.is_empty());
    }
}
