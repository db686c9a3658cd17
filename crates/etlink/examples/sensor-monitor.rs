//! Host and simulated firmware exchanging records over an in-memory link.
//!
//! Run with:
//!   cargo run --example sensor-monitor
//!
//! Against real hardware, replace `Channel::open(host, ..)` with
//! `Channel::connect("/dev/ttyACM0", ..).await` after configuring the port
//! (e.g. `stty -F /dev/ttyACM0 115200 raw`).

use std::sync::Arc;
use std::time::Duration;

use etlink::channel::{lock_recording, Channel, ChannelConfig, ChannelMode};
use etlink::frame::{build_frame, FrameAssembler};
use etlink::schema::{encode, FieldType, Record, RecordSchema};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let sensor = RecordSchema::builder("sensor")
        .field("time_ms", FieldType::U32)
        .field("temp_c", FieldType::F32)
        .field("hello_received", FieldType::Bool)
        .build_shared()?;
    let command = RecordSchema::builder("command")
        .field("pc_time_ms", FieldType::U32)
        .field("hello_flag", FieldType::Bool)
        .build_shared()?;

    let (host, device) = tokio::io::duplex(1024);
    let firmware = tokio::spawn(simulated_firmware(device, Arc::clone(&sensor)));

    let config = ChannelConfig::new("arduino", ChannelMode::Both)
        .with_read_schema(sensor)
        .with_write_schema(Arc::clone(&command))
        .with_recording_capacity(1000);
    let channel = Channel::open(host, config)?;
    channel.start_recording()?;

    let hello = Record::new(command)
        .with("pc_time_ms", 42u32)?
        .with("hello_flag", true)?;
    channel.send(&hello).await?;

    while let Some(record) = channel.recv().await {
        let fields: Vec<String> = record
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!("{}", fields.join(" "));
    }

    channel.close().await?;
    firmware.await??;

    let recording = channel.recording().ok_or("recording missing")?;
    let buffer = lock_recording(&recording);
    println!(
        "recorded {} of {} records; temp_c = {}",
        buffer.len(),
        buffer.capacity(),
        format_column(buffer.column("temp_c"))
    );
    Ok(())
}

/// Waits for the host's hello, then streams ten readings and hangs up.
async fn simulated_firmware(
    mut link: tokio::io::DuplexStream,
    schema: Arc<RecordSchema>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut assembler = FrameAssembler::new();
    let mut buf = [0u8; 64];
    let mut hello = false;
    while !hello {
        let n = link.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        hello = assembler.feed(&buf[..n]).into_iter().any(|item| item.is_ok());
    }

    for i in 0..10u32 {
        let reading = Record::new(Arc::clone(&schema))
            .with("time_ms", i * 100)?
            .with("temp_c", 21.0f32 + i as f32 * 0.25)?
            .with("hello_received", hello)?;
        let frame = build_frame(&encode(&schema, &reading)?)?;
        link.write_all(&frame).await?;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

fn format_column(column: Option<&etlink::channel::Column>) -> String {
    match column {
        Some(column) => (0..column.len())
            .filter_map(|i| column.get(i))
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        None => "-".to_string(),
    }
}
