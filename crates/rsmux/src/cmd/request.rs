use serde_json::Value;
use tokio::time;

use crate::cmd::{parse_duration, settle, RequestArgs};
use crate::exit::{client_error, timeout_error, CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

pub async fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let data = args.payload.value()?;
    let client = args.connect.open().await?;

    let interaction = match client.request_response::<Value>(&args.route, &data, None) {
        Ok(interaction) => interaction,
        Err(err) => {
            client.disconnect().await;
            return Err(client_error("request failed", err));
        }
    };
    let settled = time::timeout(timeout, interaction.settled()).await;
    client.disconnect().await;

    let state = settled.map_err(|_| timeout_error(&args.route, timeout))?;
    settle(&args.route, &state)?;
    if let Some(value) = interaction.get() {
        print_value(&args.route, 0, &value, format);
    }
    Ok(SUCCESS)
}
