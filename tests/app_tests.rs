//! Application Configuration Tests
//!
//! A single-generation configuration built directly on the library types,
//! the way an application embedding the parser would use it.

use std::path::Path;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde::Deserialize;
use versioned_config::yaml::{multi_decoder_hook, DecoderHook, Node, YamlFormat, YamlParser};
use versioned_config::{Change, Changelog, Constraint, Mark, Parser, Position, Result, VersionedConfig, Warning};

#[derive(Debug, Clone, PartialEq, Eq)]
struct App {
    version: String,
    host: String,
    port: u16,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "AppV1")]
struct AppV1 {
    #[serde(default)]
    version: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    port: u16,
    #[serde(default, rename = "authToken")]
    auth_token: String,
}

impl VersionedConfig<App> for AppV1 {
    fn to_config(self: Box<Self>) -> Result<App> {
        Ok(App {
            version: self.version,
            host: self.host,
            port: self.port,
            auth_token: (!self.auth_token.is_empty()).then_some(self.auth_token),
        })
    }
}

fn changelog() -> Changelog {
    Changelog::new()
        .with_version("1.0", vec![])
        .unwrap()
        .with_version(
            "1.1",
            vec![Change::introduced("authToken", "authToken is a field introduced in 1.1")],
        )
        .unwrap()
        .with_version(
            "1.2",
            vec![Change::deprecated(
                "port",
                "port is deprecated in 1.2, and will be removed in a future version",
            )],
        )
        .unwrap()
}

fn app_parser(hook: Option<DecoderHook>) -> Parser<App, YamlFormat> {
    let mut parser = YamlParser::<App, AppV1>::new(Constraint::parse("^1").unwrap(), &changelog());
    if let Some(hook) = hook {
        parser = parser.with_hook(hook);
    }
    Parser::new(YamlFormat, Vec::new()).with_parser(parser)
}

fn with_version(version: &str) -> String {
    format!("version: {version}\nhost: localhost\nport: 8080\nauthToken: abc\n")
}

#[test]
fn test_fixture_with_premature_field() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/app.yml");
    let file = std::fs::File::open(path).unwrap();
    let (configs, warnings) = app_parser(None).parse(file).unwrap();

    assert_eq!(
        configs,
        vec![App {
            version: "1.0".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            auth_token: Some("abc".to_string()),
        }]
    );
    assert_eq!(
        warnings.into_inner(),
        vec![Warning::new(
            Position::new("authToken", Mark::new(4, 1), "abc"),
            "authToken is a field introduced in 1.1"
        )]
    );
}

#[test]
fn test_field_valid_from_introduction() {
    let (_, warnings) = app_parser(None).parse(with_version("1.1").as_bytes()).unwrap();
    assert!(warnings.is_empty());
}

#[test]
fn test_deprecated_field() {
    let (_, warnings) = app_parser(None).parse(with_version("1.2").as_bytes()).unwrap();
    assert_eq!(
        warnings.into_inner(),
        vec![Warning::new(
            Position::new("port", Mark::new(3, 1), "8080"),
            "port is deprecated in 1.2, and will be removed in a future version"
        )]
    );
}

#[test]
fn test_newer_minor_version_uses_best_match() {
    let (configs, warnings) = app_parser(None).parse(with_version("1.5").as_bytes()).unwrap();
    assert_eq!(configs.len(), 1);
    let messages: Vec<_> = warnings.iter().map(|w| w.to_string()).collect();
    assert_eq!(
        messages,
        vec![
            "no parser found for version 1.5.0, using parser for version 1.2.0 with constraint ^1".to_string(),
            "line 3, column 1: port is deprecated in 1.2, and will be removed in a future version".to_string(),
        ]
    );
}

#[test]
fn test_hooks_see_every_field() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record: DecoderHook = {
        let seen = Arc::clone(&seen);
        Arc::new(move |path: &[String], mark: Mark, _: &mut Node| {
            seen.lock().unwrap().push((path.join("."), mark.line));
        })
    };
    let upper: DecoderHook = Arc::new(|path: &[String], _: Mark, node: &mut Node| {
        if path.len() == 1 && path[0] == "host" {
            let value = node.scalar_value().to_uppercase();
            node.set_value(value);
        }
    });
    let hook = multi_decoder_hook([record, upper]);

    let (configs, _) = app_parser(hook).parse(with_version("1.1").as_bytes()).unwrap();
    assert_eq!(configs[0].host, "LOCALHOST");
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (String::new(), 1),
            ("version".to_string(), 1),
            ("host".to_string(), 2),
            ("port".to_string(), 3),
            ("authToken".to_string(), 4),
        ]
    );
}
