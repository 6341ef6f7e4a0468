mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rsmux", version, about = "RSocket client CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). RSMUX_LOG overrides it.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_subcommand() {
        let cli = Cli::try_parse_from([
            "rsmux",
            "request",
            "ws://localhost:7000/rsocket",
            "echo",
            "--json",
            "{\"msg\":\"hi\"}",
            "--timeout",
            "3s",
        ])
        .expect("request args should parse");

        let Command::Request(args) = cli.command else {
            panic!("expected request command");
        };
        assert_eq!(args.connect.url, "ws://localhost:7000/rsocket");
        assert_eq!(args.route, "echo");
        assert_eq!(args.timeout, "3s");
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "rsmux",
            "request",
            "tcp://127.0.0.1:7000",
            "echo",
            "--json",
            "{\"x\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_channel_items_and_connection_flags() {
        let cli = Cli::try_parse_from([
            "rsmux",
            "--format",
            "json",
            "channel",
            "tcp://127.0.0.1:7000",
            "upper",
            "--item",
            "\"a\"",
            "--item",
            "\"b\"",
            "--count",
            "2",
            "--max-reconnect-attempts",
            "0",
            "--json-serializer",
        ])
        .expect("channel args should parse");

        let Command::Channel(args) = cli.command else {
            panic!("expected channel command");
        };
        assert_eq!(args.items, vec!["\"a\"", "\"b\""]);
        assert_eq!(args.count, Some(2));
        assert_eq!(args.connect.max_reconnect_attempts, 0);
        assert!(args.connect.json_serializer);
    }

    #[test]
    fn channel_requires_an_item() {
        let err = Cli::try_parse_from(["rsmux", "channel", "ws://localhost:7000", "upper"])
            .expect_err("channel without items should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_version_subcommand() {
        let cli = Cli::try_parse_from(["rsmux", "version", "--extended"])
            .expect("version args should parse");
        assert!(matches!(cli.command, Command::Version(_)));
    }
}
