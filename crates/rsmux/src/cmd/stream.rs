use serde_json::Value;

use crate::cmd::{follow, parse_optional_duration, StreamArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub async fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_optional_duration(args.timeout.as_deref())?;
    let data = args.payload.value()?;
    let client = args.connect.open().await?;

    let result = match client.request_stream::<Value>(&args.route, &data, args.count, None) {
        Ok(interaction) => follow(&interaction, &args.route, args.count, timeout, format).await,
        Err(err) => Err(client_error("stream request failed", err)),
    };
    client.disconnect().await;
    result.map(|()| SUCCESS)
}
