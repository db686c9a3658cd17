use std::time::Duration;

use tracing::info;

use etlink_channel::{Channel, ChannelConfig, ChannelMode};
use etlink_schema::Record;

use crate::cmd::{block_on, channel_name, load_schema, parse_duration, MonitorArgs};
use crate::exit::{channel_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_record, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let schema = load_schema(&args.schema)?;
    let idle_timeout = args.idle_timeout.as_deref().map(parse_duration).transpose()?;
    let config = ChannelConfig::new(channel_name(&args.port), ChannelMode::ReadOnly)
        .with_read_schema(schema);

    block_on(async {
        let channel = Channel::connect(&args.port, config)
            .await
            .map_err(|err| channel_error("connect failed", err))?;

        let mut received = 0usize;
        let mut timed_out = false;
        while args.count.is_none_or(|limit| received < limit) {
            let next = tokio::select! {
                next = next_record(&channel, idle_timeout) => next,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break;
                }
            };
            match next {
                Some(Some(record)) => {
                    print_record(&record, channel.name(), format);
                    received += 1;
                }
                Some(None) => break,
                None => {
                    timed_out = true;
                    break;
                }
            }
        }

        let stats = channel.stats();
        channel
            .close()
            .await
            .map_err(|err| channel_error("link failed", err))?;
        info!(
            received,
            checksum_errors = stats.assembler.checksum_errors,
            discarded_bytes = stats.assembler.discarded_bytes,
            "monitor stopped"
        );

        if timed_out {
            return Err(CliError::new(
                TIMEOUT,
                format!("no record within {}", args.idle_timeout.as_deref().unwrap_or_default()),
            ));
        }
        Ok(SUCCESS)
    })
}

/// Next record, `Some(None)` once the link has closed, `None` on idle timeout.
async fn next_record(channel: &Channel, idle_timeout: Option<Duration>) -> Option<Option<Record>> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, channel.recv()).await.ok(),
        None => Some(channel.recv().await),
    }
}
