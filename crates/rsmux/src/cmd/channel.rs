use serde_json::Value;

use crate::cmd::{follow, parse_json, parse_optional_duration, ChannelArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub async fn run(args: ChannelArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_optional_duration(args.timeout.as_deref())?;
    let items = args
        .items
        .iter()
        .map(|item| parse_json("--item", item))
        .collect::<CliResult<Vec<Value>>>()?;
    let client = args.connect.open().await?;

    let result = match client.channel::<Value, _>(&args.route, items, args.count, None) {
        Ok(interaction) => follow(&interaction, &args.route, args.count, timeout, format).await,
        Err(err) => Err(client_error("channel request failed", err)),
    };
    client.disconnect().await;
    result.map(|()| SUCCESS)
}
