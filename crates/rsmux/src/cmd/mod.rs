use std::future::Future;
use std::time::Duration;

use clap::{Args, Subcommand};
use rsmux_client::{Client, ClientConfig, Interaction, InteractionState, JsonSerializer};
use serde_json::Value;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::exit::{
    client_error, interaction_error, timeout_error, CliError, CliResult, INTERNAL, USAGE,
};
use crate::output::{print_value, OutputFormat};

pub mod channel;
pub mod fire;
pub mod request;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a request and print the single response.
    Request(RequestArgs),
    /// Request a stream and print each value.
    Stream(StreamArgs),
    /// Open a channel, send items and print each inbound value.
    Channel(ChannelArgs),
    /// Send a fire-and-forget request.
    Fire(FireArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Request(args) => block_on(request::run(args, format)),
        Command::Stream(args) => block_on(stream::run(args, format)),
        Command::Channel(args) => block_on(channel::run(args, format)),
        Command::Fire(args) => block_on(fire::run(args)),
        Command::Version(args) => version::run(args),
    }
}

fn block_on(future: impl Future<Output = CliResult<i32>>) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))?;
    runtime.block_on(future)
}

/// Connection flags shared by every interaction command.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Server endpoint (ws://, wss:// or tcp://).
    pub url: String,
    /// Bearer token sent with SETUP and every request.
    #[arg(long, env = "RSMUX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Keep-alive interval (e.g. 60s, 500ms).
    #[arg(long, default_value = "60s")]
    pub keep_alive: String,
    /// Maximum time without a frame from the server.
    #[arg(long, default_value = "180s")]
    pub lifetime: String,
    /// Reconnection attempts before giving up.
    #[arg(long, default_value_t = rsmux_client::reconnect::DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    pub max_reconnect_attempts: u32,
    /// Delay between reconnection attempts.
    #[arg(long, default_value = "2s")]
    pub reconnect_delay: String,
    /// Maximum time to wait for the session to connect.
    #[arg(long, default_value = "10s")]
    pub connect_timeout: String,
    /// Decode responses with the JSON serializer instead of the identity serializer.
    #[arg(long)]
    pub json_serializer: bool,
}

impl ConnectArgs {
    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let mut config = ClientConfig::new(self.url.as_str())
            .with_keep_alive(parse_duration(&self.keep_alive)?)
            .with_lifetime(parse_duration(&self.lifetime)?)
            .with_max_reconnect_attempts(self.max_reconnect_attempts)
            .with_reconnect_delay(parse_duration(&self.reconnect_delay)?);
        if self.json_serializer {
            config = config.with_serializer(JsonSerializer);
        }
        if let Some(token) = self.token.as_deref().filter(|token| !token.is_empty()) {
            config = config.with_token(token);
        }
        Ok(config)
    }

    /// Start a client and wait until its session is connected.
    pub async fn open(&self) -> CliResult<Client> {
        let config = self.client_config()?;
        let connect_timeout = parse_duration(&self.connect_timeout)?;
        let client =
            rsmux_client::connect(config).map_err(|err| client_error("connect failed", err))?;

        match time::timeout(connect_timeout, client.ready()).await {
            Ok(Ok(())) => Ok(client),
            Ok(Err(err)) => {
                client.disconnect().await;
                Err(client_error(&format!("connect to {} failed", self.url), err))
            }
            Err(_) => {
                client.disconnect().await;
                Err(timeout_error(
                    &format!("connect to {}", self.url),
                    connect_timeout,
                ))
            }
        }
    }
}

/// Request data: JSON, a raw string, or nothing.
#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
}

impl PayloadArgs {
    pub fn value(&self) -> CliResult<Value> {
        if let Some(json) = &self.json {
            return parse_json("--json", json);
        }
        if let Some(data) = &self.data {
            return Ok(Value::String(data.clone()));
        }
        Ok(Value::Null)
    }
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Route to address.
    pub route: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Maximum time to wait for the response.
    #[arg(long, default_value = "30s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Route to address.
    pub route: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Request and print at most N values. Default: unbounded.
    #[arg(long)]
    pub count: Option<u32>,
    /// Stop waiting after this long (e.g. 30s). Default: until the stream ends.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct ChannelArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Route to address.
    pub route: String,
    /// Outbound JSON item; repeat for more.
    #[arg(long = "item", value_name = "JSON", required = true)]
    pub items: Vec<String>,
    /// Request and print at most N values. Default: unbounded.
    #[arg(long)]
    pub count: Option<u32>,
    /// Stop waiting after this long (e.g. 30s). Default: until the channel ends.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct FireArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Route to address.
    pub route: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_json(flag: &str, input: &str) -> CliResult<Value> {
    serde_json::from_str(input)
        .map_err(|err| CliError::new(USAGE, format!("{flag} is not valid JSON: {err}")))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub(crate) fn parse_optional_duration(input: Option<&str>) -> CliResult<Option<Duration>> {
    input.map(parse_duration).transpose()
}

/// Print values of a stream or channel as they arrive, until it settles,
/// `limit` values have been printed, `timeout` passes or Ctrl-C.
pub(crate) async fn follow(
    interaction: &Interaction<Vec<Value>>,
    route: &str,
    limit: Option<u32>,
    timeout: Option<Duration>,
    format: OutputFormat,
) -> CliResult<()> {
    let mut values = interaction.value().watch();
    let mut state = interaction.state_cell().watch();
    let deadline = timeout.map(|timeout| Instant::now() + timeout);
    let limit = limit.map(|limit| limit as usize);
    let mut printed = 0usize;

    loop {
        // State first: a value always lands before the state that ends it.
        let current = state.borrow_and_update().clone();
        let batch: Vec<Value> = values
            .borrow_and_update()
            .iter()
            .skip(printed)
            .cloned()
            .collect();
        for value in batch {
            print_value(route, printed, &value, format);
            printed += 1;
            if limit.is_some_and(|limit| printed >= limit) {
                return Ok(());
            }
        }
        if current.is_settled() {
            return settle(route, &current);
        }

        tokio::select! {
            _ = values.changed() => {}
            _ = state.changed() => {}
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                return Err(timeout_error(route, timeout.unwrap_or_default()));
            }
            _ = tokio::signal::ctrl_c() => {
                debug!(printed, "interrupted");
                return Ok(());
            }
        }
    }
}

pub(crate) fn settle(route: &str, state: &InteractionState) -> CliResult<()> {
    match state {
        InteractionState::Completed => Ok(()),
        other => Err(interaction_error(&format!("{route} failed"), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_optional_duration(None).unwrap(), None);
    }

    #[test]
    fn payload_defaults_to_null() {
        let payload = PayloadArgs {
            json: None,
            data: None,
        };
        assert_eq!(payload.value().unwrap(), Value::Null);

        let payload = PayloadArgs {
            json: None,
            data: Some("hello".into()),
        };
        assert_eq!(payload.value().unwrap(), Value::String("hello".into()));
    }

    #[test]
    fn invalid_json_is_a_usage_error() {
        let payload = PayloadArgs {
            json: Some("{nope".into()),
            data: None,
        };
        assert_eq!(payload.value().unwrap_err().code, USAGE);
    }

    fn connect_args() -> ConnectArgs {
        ConnectArgs {
            url: "tcp://127.0.0.1:7000".into(),
            token: Some(String::new()),
            keep_alive: "500ms".into(),
            lifetime: "2s".into(),
            max_reconnect_attempts: 1,
            reconnect_delay: "100ms".into(),
            connect_timeout: "1s".into(),
            json_serializer: true,
        }
    }

    #[test]
    fn connect_args_map_onto_client_config() {
        let config = connect_args().client_config().unwrap();
        assert_eq!(config.keep_alive, Duration::from_millis(500));
        assert_eq!(config.lifetime, Duration::from_secs(2));
        assert_eq!(config.max_reconnect_attempts, 1);
        assert_eq!(config.reconnect_delay, Duration::from_millis(100));
        assert_eq!(config.data_serializer.name(), "json");
        assert!(config.token.is_none());
    }
}
