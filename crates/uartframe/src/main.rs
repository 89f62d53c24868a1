mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "uartframe", version, about = "UART message framing CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", env = "UARTFRAME_FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        env = "UARTFRAME_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "UARTFRAME_LOG_LEVEL",
        global = true
    )]
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
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from(["uartframe", "encode", "--hex", "01 02 03"])
            .expect("encode args should parse");
        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from(["uartframe", "encode", "--hex", "01", "--data", "hello"])
            .expect_err("conflicting args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn encode_requires_a_payload_source() {
        let err = Cli::try_parse_from(["uartframe", "encode"])
            .expect_err("missing payload should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_decode_options() {
        let cli = Cli::try_parse_from([
            "uartframe",
            "--format",
            "json",
            "decode",
            "-",
            "--max-payload",
            "256",
            "--timeout",
            "250ms",
            "--alloc",
            "dynamic",
            "--count",
            "2",
        ])
        .expect("decode args should parse");

        let Command::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.max_payload, 256);
        assert_eq!(args.count, Some(2));
    }

    #[test]
    fn rejects_max_payload_beyond_wire_format() {
        let err = Cli::try_parse_from(["uartframe", "decode", "-", "--max-payload", "100000000000"])
            .expect_err("oversized capacity should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "uartframe",
            "send",
            "/dev/ttyUSB0",
            "--baud",
            "9600",
            "--hex",
            "0102",
        ])
        .expect("send args should parse");
        assert!(matches!(cli.command, Command::Send(_)));
    }
}
