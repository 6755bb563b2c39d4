mod config;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use param_schema_core::{CheckError, CheckOptions, Schema, check_with};
use serde_json::{Map, Value};

/// Exit status for input that fails its schema.
const EXIT_REJECTED: u8 = 2;

/// Output format for normalized values.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "param-check", version)]
#[command(about = "Check and normalize JSON documents and parameters against a schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a JSON document (file or stdin) and print its normalized form.
    Check(CheckArgs),
    /// Check `key=value` parameters, as delivered by a query string.
    Params(ParamsArgs),
    /// Load a schema file and report what it declares.
    Lint(LintArgs),
}

#[derive(Debug, Args)]
struct OptionArgs {
    /// Schema JSON file.
    #[arg(long)]
    schema: PathBuf,
    /// YAML file of check options.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Reject object keys the schema does not declare.
    #[arg(long)]
    strict: bool,
    /// Do not fill in defaults for absent fields.
    #[arg(long)]
    ignore_defaults: bool,
    /// Skip required-field checks.
    #[arg(long)]
    ignore_required: bool,
    /// Do not convert strings to declared numbers and booleans.
    #[arg(long)]
    do_not_coerce: bool,
    /// Output format for the normalized value.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    options: OptionArgs,
    /// JSON document to check (reads stdin when omitted).
    input: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ParamsArgs {
    #[command(flatten)]
    options: OptionArgs,
    /// Parameter as `key=value`; may be repeated.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Schema JSON file.
    schema: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Params(args) => run_params(args),
        Command::Lint(args) => run_lint(args).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_REJECTED),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// check command
// ---------------------------------------------------------------------------

fn run_check(args: CheckArgs) -> Result<bool, String> {
    let raw = match &args.input {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            buf
        }
    };
    let value: Value =
        serde_json::from_str(&raw).map_err(|err| format!("Failed to parse input JSON: {err}"))?;

    run_checked(value, &args.options)
}

// ---------------------------------------------------------------------------
// params command
// ---------------------------------------------------------------------------

fn run_params(args: ParamsArgs) -> Result<bool, String> {
    let value = Value::Object(parse_params(&args.params)?);
    run_checked(value, &args.options)
}

/// Builds an object of string values from `key=value` pairs. A later pair
/// overrides an earlier one with the same key.
fn parse_params(pairs: &[String]) -> Result<Map<String, Value>, String> {
    let mut params = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Invalid parameter '{pair}': expected KEY=VALUE"))?;
        if key.is_empty() {
            return Err(format!("Invalid parameter '{pair}': empty key"));
        }
        params.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(params)
}

// ---------------------------------------------------------------------------
// lint command
// ---------------------------------------------------------------------------

fn run_lint(args: LintArgs) -> Result<(), String> {
    let schema = load_schema(&args.schema)?;
    let fields = schema.field_schemas();
    let required = fields.iter().filter(|(_, field)| field.required).count();
    let defaulted = fields.iter().filter(|(_, field)| field.default.is_some()).count();

    println!(
        "Schema '{}' declares {} top-level field(s) ({required} required, {defaulted} with defaults).",
        args.schema.display(),
        fields.len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_schema(path: &Path) -> Result<Schema, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    let json: Value = serde_json::from_str(&raw)
        .map_err(|err| format!("Failed to parse schema '{}': {err}", path.display()))?;
    let schema = Schema::from_json(&json).map_err(|err| format!("'{}': {err}", path.display()))?;
    tracing::debug!(path = %path.display(), fields = schema.field_schemas().len(), "loaded schema");
    Ok(schema)
}

fn resolve_options(args: &OptionArgs) -> Result<CheckOptions, String> {
    let mut options = CheckOptions::default();
    if let Some(path) = &args.config {
        options = options.merged(&config::load_options(path)?);
    }

    let flags = [
        ("strict", args.strict),
        ("ignoreDefaults", args.ignore_defaults),
        ("ignoreRequired", args.ignore_required),
        ("doNotCoerce", args.do_not_coerce),
    ];
    let overrides: Map<String, Value> = flags
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| (name.to_string(), Value::Bool(true)))
        .collect();

    let options = options.merged(&overrides);
    tracing::debug!(?options, "resolved check options");
    Ok(options)
}

/// Checks `value` and prints either the normalized value or the error.
/// Returns whether the value passed.
fn run_checked(mut value: Value, args: &OptionArgs) -> Result<bool, String> {
    let schema = load_schema(&args.schema)?;
    let options = resolve_options(args)?;

    match check_with(&mut value, &schema, &options) {
        Ok(()) => {
            println!("{}", render(&value, args.format)?);
            Ok(true)
        }
        Err(err) => {
            print_rejection(&err)?;
            Ok(false)
        }
    }
}

fn render(value: &Value, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|err| format!("Failed to serialize output: {err}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|err| format!("Failed to serialize output: {err}"))
        }
    }
}

fn print_rejection(err: &CheckError) -> Result<(), String> {
    let json = serde_json::to_string_pretty(err)
        .map_err(|e| format!("Failed to serialize error: {e}"))?;
    println!("{json}");
    eprintln!("{err}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params_builds_string_object() {
        let params = parse_params(&["a=1".to_string(), "b=x=y".to_string(), "a=2".to_string()]).unwrap();
        assert_eq!(params["a"], "2");
        assert_eq!(params["b"], "x=y");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_params_rejects_malformed_pairs() {
        assert!(parse_params(&["novalue".to_string()]).is_err());
        assert!(parse_params(&["=1".to_string()]).is_err());
    }

    #[test]
    fn test_parse_params_allows_empty_values() {
        let params = parse_params(&["q=".to_string()]).unwrap();
        assert_eq!(params["q"], "");
    }
}
