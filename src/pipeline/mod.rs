//! Pipeline configuration files
//!
//! Two schema generations are supported: [`v1`] (`^1`) and [`v2`] (`^2`).
//! Both decode into the canonical [`model::Configuration`].

pub mod model;
pub mod v1;
pub mod v2;

use crate::error::Result;
use crate::parser::{Parser, VersionedConfigParser};
use crate::version::Constraint;
use crate::yaml::{DecoderHook, Node, YamlFormat, YamlParser};

/// Build the dispatching parser for pipeline configuration files
///
/// `hook` runs on every node of every document before it is linted and
/// decoded; `strict` controls whether unknown fields are reported.
pub fn parser(hook: Option<DecoderHook>, strict: bool) -> Result<Parser<model::Configuration, YamlFormat>> {
    let mut v1_parser =
        YamlParser::<model::Configuration, v1::Configuration>::new(Constraint::parse("^1")?, &v1::changelog()?)
            .strict(strict);
    let mut v2_parser =
        YamlParser::<model::Configuration, v2::Configuration>::new(Constraint::parse("^2")?, &v2::changelog()?)
            .strict(strict);
    if let Some(hook) = hook {
        v1_parser = v1_parser.with_hook(hook.clone());
        v2_parser = v2_parser.with_hook(hook);
    }

    let parsers: Vec<Box<dyn VersionedConfigParser<model::Configuration, Node>>> =
        vec![Box::new(v1_parser), Box::new(v2_parser)];
    Ok(Parser::new(YamlFormat, parsers))
}
