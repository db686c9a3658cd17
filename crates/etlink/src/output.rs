use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use etlink_frame::{build_frame, FrameError};
use etlink_schema::{FieldValue, Record, RecordSchema};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    schema: &'a str,
    channel: &'a str,
    fields: serde_json::Map<String, serde_json::Value>,
    timestamp: String,
}

pub fn print_record(record: &Record, channel: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let fields = record
                .iter()
                .map(|(name, value)| (name.to_string(), field_json(value)))
                .collect();
            let out = RecordOutput {
                schema: record.schema().name(),
                channel,
                fields,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(record.iter().map(|(name, _)| name.to_string()))
                .add_row(record.iter().map(|(_, value)| value.to_string()));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = record
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("[{channel}] {}", fields.join(" "));
        }
        OutputFormat::Raw => match record_frame(record) {
            Ok(frame) => print_raw(&frame),
            Err(err) => tracing::warn!(error = %err, "cannot re-encode record"),
        },
    }
}

#[derive(Serialize)]
struct LayoutField<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    field_type: &'a str,
    offset: usize,
    width: usize,
}

#[derive(Serialize)]
struct LayoutOutput<'a> {
    name: &'a str,
    byte_order: etlink_schema::ByteOrder,
    total_size: usize,
    fields: Vec<LayoutField<'a>>,
}

pub fn print_schema(schema: &RecordSchema, format: OutputFormat) {
    let fields: Vec<LayoutField<'_>> = schema
        .fields()
        .iter()
        .map(|field| LayoutField {
            name: &field.name,
            field_type: field.field_type.name(),
            offset: field.offset,
            width: field.width(),
        })
        .collect();

    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            let out = LayoutOutput {
                name: schema.name(),
                byte_order: schema.byte_order(),
                total_size: schema.total_size(),
                fields,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "TYPE", "OFFSET", "WIDTH"]);
            for field in &fields {
                table.add_row(vec![
                    field.name.to_string(),
                    field.field_type.to_string(),
                    field.offset.to_string(),
                    field.width.to_string(),
                ]);
            }
            println!("{table}");
            println!("{}: {} bytes", schema.name(), schema.total_size());
        }
        OutputFormat::Pretty => {
            println!("{} ({} bytes)", schema.name(), schema.total_size());
            for field in &fields {
                println!(
                    "  {:<16} {:<5} offset={} width={}",
                    field.name, field.field_type, field.offset, field.width
                );
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// The wire frame carrying `record`.
pub fn record_frame(record: &Record) -> Result<Vec<u8>, FrameError> {
    let payload = etlink_schema::encode(record.schema(), record)?;
    Ok(build_frame(&payload)?.to_vec())
}

/// Space-separated uppercase hex, e.g. `06 85 09`.
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_json(value: FieldValue) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
