use serde::Serialize;

use crate::cmd::{build_record, load_schema, FrameArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{hex, print_raw, record_frame, OutputFormat};

#[derive(Serialize)]
struct FrameOutput<'a> {
    schema: &'a str,
    payload_size: usize,
    frame_size: usize,
    frame: String,
}

pub fn run(args: FrameArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = load_schema(&args.schema)?;
    let record = build_record(&schema, &args.fields)?;
    let frame = record_frame(&record).map_err(|err| frame_error("failed to build frame", err))?;

    match format {
        OutputFormat::Raw => print_raw(&frame),
        OutputFormat::Json => {
            let out = FrameOutput {
                schema: schema.name(),
                payload_size: schema.total_size(),
                frame_size: frame.len(),
                frame: hex(&frame),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", hex(&frame)),
    }
    Ok(SUCCESS)
}
