//! Pipeline configuration linter CLI
//!
//! Parses pipeline configuration files of any supported version and reports
//! deprecated, premature and unknown fields.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;
use versioned_config::pipeline::{self, model};
use versioned_config::settings::{OutputFormat, Settings};
use versioned_config::{parse_version, Changelog, FieldLinter, Warnings};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "config-lint")]
#[command(about = "Check versioned pipeline configuration files")]
struct Cli {
    /// Settings file, layered over config-lint.toml
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Do not report fields unknown to the schema
    #[arg(long)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse files and report warnings
    Check {
        /// Files or directories (searched for .yml and .yaml files)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Fail when any warning is reported
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Print the canonical configuration of a file as JSON
    Show {
        file: PathBuf,
    },

    /// Print the expanded changelog of a schema generation
    Changelog {
        #[arg(long, value_enum, default_value_t = Schema::V2)]
        schema: Schema,

        /// Only print the field tree applying to this version
        #[arg(long)]
        version: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Schema {
    V1,
    V2,
}

impl Schema {
    fn changelog(self) -> versioned_config::Result<Changelog> {
        match self {
            Schema::V1 => pipeline::v1::changelog(),
            Schema::V2 => pipeline::v2::changelog(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load_from(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: failed to load settings: {}", e);
            std::process::exit(2);
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli, settings) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded
fn run(cli: Cli, mut settings: Settings) -> anyhow::Result<bool> {
    if cli.lenient {
        settings.parser.strict = false;
    }

    match cli.command {
        Commands::Check { paths, deny_warnings } => check(&paths, deny_warnings, &settings),
        Commands::Show { file } => {
            let (configs, warnings) = parse_file(&file, &settings)?;
            warnings.log();
            print_json(&configs, settings.output.format)?;
            Ok(true)
        }
        Commands::Changelog { schema, version } => {
            let linter = FieldLinter::new(&schema.changelog()?);
            match version {
                Some(version) => {
                    let version = parse_version(&version)?;
                    match linter.changelog_for_version(&version) {
                        Some(tree) => print_json(tree, settings.output.format)?,
                        None => println!("no field changes apply to version {}", version),
                    }
                }
                None => {
                    let trees: Vec<_> = linter
                        .expanded()
                        .iter()
                        .map(|(version, tree)| VersionTree {
                            version: version.to_string(),
                            fields: tree,
                        })
                        .collect();
                    print_json(&trees, settings.output.format)?;
                }
            }
            Ok(true)
        }
    }
}

#[derive(Serialize)]
struct VersionTree<'a> {
    version: String,
    fields: &'a versioned_config::FieldTree,
}

fn check(paths: &[PathBuf], deny_warnings: bool, settings: &Settings) -> anyhow::Result<bool> {
    let files = collect_files(paths);
    if files.is_empty() {
        bail!("no configuration files found");
    }

    let mut failed = 0;
    let mut warned = 0;
    for file in &files {
        let _span = info_span!("check", file = %file.display()).entered();
        match parse_file(file, settings) {
            Ok((configs, warnings)) => {
                warnings.log();
                if !warnings.is_empty() {
                    warned += 1;
                }
                info!(
                    documents = configs.len(),
                    pipelines = configs.iter().map(|c| c.pipelines.len()).sum::<usize>(),
                    warnings = warnings.len(),
                    "parsed configuration"
                );
                if settings.output.show_config {
                    print_json(&configs, settings.output.format)?;
                }
            }
            Err(e) => {
                failed += 1;
                tracing::error!("{:#}", e);
            }
        }
    }

    println!(
        "{} file(s) checked, {} with warnings, {} failed",
        files.len(),
        warned,
        failed
    );
    Ok(failed == 0 && !(deny_warnings && warned > 0))
}

fn parse_file(path: &Path, settings: &Settings) -> anyhow::Result<(Vec<model::Configuration>, Warnings)> {
    let parser = pipeline::parser(settings.decoder_hook(), settings.parser.strict)?;
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parser
        .parse(file)
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Expand directories into the YAML files they contain
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yml" || ext == "yaml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }
    files
}

fn print_json<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let json = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    println!("{}", json);
    Ok(())
}
