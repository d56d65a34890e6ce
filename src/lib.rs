//! Versioned Configuration Parsing
//!
//! Parses configuration documents whose schema evolves over time. Every
//! document declares the version it was written against; the parser picks
//! the schema generation accepting that version, decodes the document, and
//! converts it into one canonical type.
//!
//! ## Features
//!
//! - **Version Dispatch**: one decoder per schema generation, selected by a
//!   semver constraint, with a best-match fallback for newer minor versions
//! - **Changelog Linting**: fields used outside the versions in which they
//!   are valid are reported as positioned warnings
//! - **Strict Decoding**: fields no schema declares are reported together
//!   instead of failing on the first one
//! - **Multi-Document Streams**: every YAML document in a stream is parsed
//!   on its own and may declare a different version
//!
//! ## Architecture
//!
//! ```text
//! reader ─► DocumentFormat ─► documents
//!                               │
//!                               ├─► version ─► Parser ─► VersionedConfigParser (^1, ^2, ...)
//!                               │                          │
//!                               │               FieldLinter (expanded changelog)
//!                               ▼                          ▼
//!                         VersionedConfig ─► to_config() ─► canonical T + Warnings
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use versioned_config::pipeline;
//!
//! let parser = pipeline::parser(None, true)?;
//! let file = std::fs::File::open("pipelines.yml")?;
//! let (configs, warnings) = parser.parse(file)?;
//! warnings.log();
//! println!("{} pipeline configurations", configs.len());
//! # Ok::<(), versioned_config::ConfigError>(())
//! ```

pub mod changelog;
pub mod error;
pub mod lint;
pub mod parser;
pub mod pipeline;
pub mod settings;
pub mod version;
pub mod warning;
pub mod yaml;

pub use changelog::{Change, ChangeKind, Changelog, ExpandedChangelog, FieldTree, FieldTreeNode};
pub use error::{ConfigError, Result};
pub use lint::{FieldLinter, LintSession};
pub use parser::{DocumentFormat, Parser, VersionedConfig, VersionedConfigParser};
pub use version::{latest_version, parse_version, Constraint};
pub use warning::{Mark, Position, Warning, Warnings};
