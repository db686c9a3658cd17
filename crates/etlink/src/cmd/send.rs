use tracing::info;

use etlink_channel::{Channel, ChannelConfig, ChannelMode};

use crate::cmd::{block_on, build_record, channel_name, load_schema, SendArgs};
use crate::exit::{channel_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let schema = load_schema(&args.schema)?;
    let record = build_record(&schema, &args.fields)?;
    let config = ChannelConfig::new(channel_name(&args.port), ChannelMode::WriteOnly)
        .with_write_schema(schema);

    block_on(async {
        let channel = Channel::connect(&args.port, config)
            .await
            .map_err(|err| channel_error("connect failed", err))?;
        channel
            .send(&record)
            .await
            .map_err(|err| channel_error("send failed", err))?;
        channel
            .close()
            .await
            .map_err(|err| channel_error("close failed", err))?;
        info!(port = %args.port.display(), schema = %record.schema().name(), "record sent");
        Ok(SUCCESS)
    })
}
