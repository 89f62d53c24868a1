use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use uartframe_frame::ErrorKind;
use uartframe_link::LinkStats;

use crate::cmd::input::to_hex;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Message {
        id: u8,
        body_size: usize,
        body: String,
    },
    Error {
        kind: &'a str,
    },
    Frame {
        payload_size: usize,
        frame_size: usize,
        hex: String,
    },
    Stats(&'a LinkStats),
}

fn print_json(record: &Record<'_>) {
    println!(
        "{}",
        serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
    );
}

fn single_row_table(header: Vec<&str>, row: Vec<String>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    table
}

/// Print one decoded message.
pub fn print_message(id: u8, body: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&Record::Message {
            id,
            body_size: body.len(),
            body: to_hex(body),
        }),
        OutputFormat::Table => {
            let table = single_row_table(
                vec!["ID", "SIZE", "BODY"],
                vec![format!("{id:#04x}"), body.len().to_string(), body_preview(body)],
            );
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "message id={id:#04x} size={} body={}",
                body.len(),
                body_preview(body)
            );
        }
        OutputFormat::Raw => print_raw(body),
    }
}

/// Print one framing or dispatch error. Raw output sends these to stderr.
pub fn print_error(kind: ErrorKind, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&Record::Error {
            kind: kind.as_str(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("error kind={kind}"),
        OutputFormat::Raw => eprintln!("error kind={kind}"),
    }
}

/// Print an encoded frame.
pub fn print_frame(payload_size: usize, frame: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&Record::Frame {
            payload_size,
            frame_size: frame.len(),
            hex: to_hex(frame),
        }),
        OutputFormat::Table => {
            let table = single_row_table(
                vec!["PAYLOAD", "FRAME", "HEX"],
                vec![
                    payload_size.to_string(),
                    frame.len().to_string(),
                    to_hex(frame),
                ],
            );
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", to_hex(frame)),
        OutputFormat::Raw => print_raw(frame),
    }
}

/// Print the end-of-run summary. Only JSON goes to stdout.
pub fn print_stats(stats: &LinkStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&Record::Stats(stats)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stat_rows(stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            eprintln!("{table}");
        }
        OutputFormat::Pretty => {
            let summary: Vec<String> = stat_rows(stats)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            eprintln!("stats {}", summary.join(" "));
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn stat_rows(stats: &LinkStats) -> [(&'static str, u64); 7] {
    [
        ("frames", stats.frames),
        ("dispatched", stats.dispatched),
        ("receive_timeouts", stats.receive_timeouts),
        ("crc_errors", stats.crc_errors),
        ("end_byte_errors", stats.end_byte_errors),
        ("unhandled_messages", stats.unhandled_messages),
        ("memory_errors", stats.memory_errors),
    ]
}

fn body_preview(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => to_hex(body),
    }
}
