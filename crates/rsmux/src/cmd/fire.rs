use tracing::info;

use crate::cmd::FireArgs;
use crate::exit::{client_error, CliResult, SUCCESS};

pub async fn run(args: FireArgs) -> CliResult<i32> {
    let data = args.payload.value()?;
    let client = args.connect.open().await?;

    let sent = client.fire_and_forget(&args.route, &data, None).await;
    client.disconnect().await;
    sent.map_err(|err| client_error("fire-and-forget failed", err))?;
    info!(route = %args.route, "fire-and-forget sent");
    Ok(SUCCESS)
}
