//! Tabula command-line front end.
//!
//! ## Usage
//!
//! ```bash
//! tabula render --config-dir tables/ --table service_list data.json
//! tabula render --config-dir tables/ --table service_list --page 2 --per-page 20 data.yaml
//! tabula validate --config-dir tables/ --table service_list
//! tabula assets --breakpoint md --chunk-size 25
//! ```
//!
//! Logging goes to stderr and honors `RUST_LOG`; `--verbose` raises the
//! default level to `debug`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tabula::{Breakpoint, ConfigRegistry, EngineSettings, Row, TableEngine};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(about = "Configuration-driven table formatting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine settings file (YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Format a dataset with a declared table type
    Render {
        /// Directory holding table declarations
        #[arg(long, value_name = "DIR")]
        config_dir: Vec<PathBuf>,

        /// Table type to render
        #[arg(long, value_name = "TYPE")]
        table: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Page to render, 1-based
        #[arg(long)]
        page: Option<usize>,

        /// Rows per page when paginating
        #[arg(long, default_value_t = 20)]
        per_page: usize,

        /// JSON or YAML file with a list of rows
        #[arg(value_name = "DATA_FILE")]
        data: PathBuf,
    },

    /// Check a table declaration without rendering
    Validate {
        #[arg(long, value_name = "DIR")]
        config_dir: Vec<PathBuf>,

        #[arg(long, value_name = "TYPE")]
        table: String,
    },

    /// Print the companion CSS and script
    Assets {
        /// Responsive breakpoint to emit rules for (repeatable; all when omitted)
        #[arg(long, value_parser = parse_breakpoint)]
        breakpoint: Vec<Breakpoint>,

        /// Override the lazy-loading chunk size
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Emit only the CSS
        #[arg(long, conflicts_with = "js_only")]
        css_only: bool,

        /// Emit only the script
        #[arg(long)]
        js_only: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

fn parse_breakpoint(s: &str) -> Result<Breakpoint, String> {
    Breakpoint::ALL
        .iter()
        .copied()
        .find(|bp| bp.as_str() == s)
        .ok_or_else(|| {
            let names: Vec<&str> = Breakpoint::ALL.iter().map(|bp| bp.as_str()).collect();
            format!("unknown breakpoint '{}', expected one of {}", s, names.join(", "))
        })
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<EngineSettings> {
    let Some(path) = path else {
        return Ok(EngineSettings::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    let settings = if is_json(path) {
        EngineSettings::from_json(&text)
    } else {
        EngineSettings::from_yaml(&text)
    };
    settings.with_context(|| format!("invalid settings in {}", path.display()))
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Reads a list of rows from a JSON or YAML file, chosen by extension.
fn load_rows(path: &Path) -> anyhow::Result<Vec<Row>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read data from {}", path.display()))?;
    let rows = if is_json(path) {
        serde_json::from_str(&text).with_context(|| format!("{} is not a JSON list of rows", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("{} is not a YAML list of rows", path.display()))?
    };
    Ok(rows)
}

fn build_engine(dirs: &[PathBuf], settings: EngineSettings) -> anyhow::Result<TableEngine> {
    if dirs.is_empty() {
        bail!("at least one --config-dir is required");
    }
    let mut registry = ConfigRegistry::new();
    for dir in dirs {
        registry
            .add_dir(dir)
            .with_context(|| format!("cannot use config directory {}", dir.display()))?;
    }
    Ok(TableEngine::builder().source(registry).settings(settings).build())
}

fn emit<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Render {
            config_dir,
            table,
            format,
            page,
            per_page,
            data,
        } => {
            let rows = load_rows(&data)?;
            let engine = build_engine(&config_dir, settings)?;
            tracing::debug!(table = %table, rows = rows.len(), "rendering");

            let text = match page {
                Some(page) => emit(&engine.render_page(&table, &rows, page, per_page), format)?,
                None => emit(&engine.render(&table, &rows), format)?,
            };
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { config_dir, table } => {
            let engine = build_engine(&config_dir, settings)?;
            let result = engine.resolver().validate_declared(&table)?;
            for error in &result.errors {
                println!("error: {}", error);
            }
            for warning in &result.warnings {
                println!("warning: {}", warning);
            }
            if result.valid {
                println!("{}: ok", table);
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Assets {
            breakpoint,
            chunk_size,
            css_only,
            js_only,
        } => {
            let chunk = chunk_size.unwrap_or(settings.lazy_chunk_size);
            if !js_only {
                println!("{}", tabula::generate_css(&breakpoint)?);
            }
            if !css_only {
                println!("{}", tabula::generate_js(chunk)?);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_render_arguments() {
        let cli = Cli::try_parse_from([
            "tabula", "render", "--config-dir", "tables", "--table", "services", "--format", "yaml",
            "--page", "2", "data.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Render { table, format, page, per_page, .. } => {
                assert_eq!(table, "services");
                assert_eq!(format, OutputFormat::Yaml);
                assert_eq!(page, Some(2));
                assert_eq!(per_page, 20);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_breakpoints() {
        assert_eq!(parse_breakpoint("md").unwrap(), Breakpoint::Md);
        assert!(parse_breakpoint("huge").unwrap_err().contains("expected one of"));
        assert!(Cli::try_parse_from(["tabula", "assets", "--breakpoint", "huge"]).is_err());
    }

    #[test]
    fn loads_rows_from_json_and_yaml() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("rows.json");
        fs::write(&json, r#"[{"name": "CMS", "price": 1000}]"#).unwrap();
        let yaml = dir.path().join("rows.yaml");
        fs::write(&yaml, "- name: CMS\n  price: 1000\n").unwrap();

        let a = load_rows(&json).unwrap();
        let b = load_rows(&yaml).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn reports_unreadable_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_rows(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("not a JSON list"));
    }

    #[test]
    fn validate_exits_non_zero_for_invalid_declarations() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ok.yaml"), "columns:\n  - { key: name, label: Name, type: text }\n").unwrap();
        fs::write(dir.path().join("bad.yaml"), "columns: []\n").unwrap();
        let dir_arg = dir.path().to_str().unwrap();

        let ok = Cli::try_parse_from(["tabula", "validate", "--config-dir", dir_arg, "--table", "ok"]).unwrap();
        assert_eq!(run(ok).unwrap(), ExitCode::SUCCESS);

        let bad = Cli::try_parse_from(["tabula", "validate", "--config-dir", dir_arg, "--table", "bad"]).unwrap();
        assert_eq!(run(bad).unwrap(), ExitCode::FAILURE);

        let missing = Cli::try_parse_from(["tabula", "validate", "--config-dir", dir_arg, "--table", "nope"]).unwrap();
        assert!(run(missing).is_err());
    }

    #[test]
    fn render_requires_a_config_dir() {
        let err = build_engine(&[], EngineSettings::default()).unwrap_err();
        assert!(err.to_string().contains("--config-dir"));
    }
}
