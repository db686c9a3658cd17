use clap::{Args, Subcommand};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use etlink_schema::{load_schema_file, FieldValue, Record, RecordSchema, SchemaError};

use crate::exit::{schema_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod frame;
pub mod monitor;
pub mod schema;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the byte layout of a schema file.
    Schema(SchemaArgs),
    /// Print records received on a port.
    Monitor(MonitorArgs),
    /// Send a single record.
    Send(SendArgs),
    /// Print the frame for a record without opening a port.
    Frame(FrameArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Schema(args) => schema::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Frame(args) => frame::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema definition file (JSON).
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Device node or Unix socket to read from.
    pub port: PathBuf,
    /// Schema of incoming records.
    #[arg(long, short = 's', value_name = "FILE")]
    pub schema: PathBuf,
    /// Exit after receiving N records.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up when no record arrives for this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub idle_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device node or Unix socket to write to.
    pub port: PathBuf,
    /// Schema of the outgoing record.
    #[arg(long, short = 's', value_name = "FILE")]
    pub schema: PathBuf,
    /// Field assignment; unset fields are zero.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Schema of the record.
    #[arg(long, short = 's', value_name = "FILE")]
    pub schema: PathBuf,
    /// Field assignment; unset fields are zero.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_assignment(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got `{input}`")),
    }
}

pub(crate) fn load_schema(path: &Path) -> CliResult<Arc<RecordSchema>> {
    load_schema_file(path)
        .map_err(|err| schema_error(&format!("failed loading {}", path.display()), err))
}

/// Record of `schema` with each assignment parsed by its field's type.
pub(crate) fn build_record(
    schema: &Arc<RecordSchema>,
    fields: &[(String, String)],
) -> CliResult<Record> {
    let mut record = Record::new(Arc::clone(schema));
    for (name, text) in fields {
        let field = schema
            .field(name)
            .ok_or_else(|| schema_error("invalid --set", SchemaError::UnknownField(name.clone())))?;
        let value = FieldValue::parse(field.field_type, text)
            .map_err(|err| schema_error(&format!("invalid value for {name}"), err))?;
        record
            .set(name, value)
            .map_err(|err| schema_error("invalid --set", err))?;
    }
    Ok(record)
}

/// Channel name for log lines: the port's file name.
pub(crate) fn channel_name(port: &Path) -> String {
    port.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| port.display().to_string())
}

/// Parse `500ms`, `5s` or a bare number of seconds. Zero is rejected.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    match number.parse::<u64>() {
        Ok(0) => Err(CliError::new(USAGE, "duration must be greater than zero")),
        Ok(value) if millis => Ok(Duration::from_millis(value)),
        Ok(value) => Ok(Duration::from_secs(value)),
        Err(_) => Err(CliError::new(
            USAGE,
            format!("invalid duration: `{input}` (expected e.g. 500ms or 5s)"),
        )),
    }
}

/// Run `future` to completion on a fresh current-thread runtime.
///
/// Device reads parked on the blocking pool are abandoned on return.
pub(crate) fn block_on<F>(future: F) -> CliResult<i32>
where
    F: Future<Output = CliResult<i32>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))?;
    let result = runtime.block_on(future);
    runtime.shutdown_background();
    result
}
