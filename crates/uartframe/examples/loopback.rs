//! Two links talking over an in-memory "wire", with line damage injected.
//!
//! Run with:
//!   cargo run --example loopback

use std::sync::{Arc, Mutex};

use uartframe::frame::{ErrorKind, FrameConfig};
use uartframe::link::Link;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let sender = Link::new();
    let mut receiver = Link::with_config(FrameConfig {
        max_payload_size: 512,
        ..FrameConfig::default()
    });
    receiver
        .on_message(move |id: u8, body: &[u8]| {
            eprintln!("message {id:#04x}: {} bytes", body.len());
            if let Ok(mut seen) = sink.lock() {
                seen.push(id);
            }
            id != 0xEE
        })
        .on_error(|kind: ErrorKind| eprintln!("link error: {kind}"));

    let mut wire = Vec::new();
    sender.send(&mut wire, &[0x01, b'h', b'i'])?;
    sender.send(&mut wire, &[0x02; 300])?;

    // Flip one checksum bit in a third frame.
    let start = wire.len();
    sender.send(&mut wire, &[0x03, 0x00])?;
    let crc_hi = wire.len() - 3;
    wire[crc_hi] ^= 0x01;
    eprintln!("damaged frame at offset {start}");

    sender.send(&mut wire, &[0xEE])?;
    sender.send(&mut wire, &[0x04])?;

    // Deliver in uneven pieces, like a UART would.
    for chunk in wire.chunks(7) {
        receiver.receive(chunk);
    }

    let stats = receiver.stats();
    eprintln!(
        "frames={} dispatched={} errors={}",
        stats.frames,
        stats.dispatched,
        stats.errors()
    );
    if let Ok(seen) = received.lock() {
        eprintln!("ids seen: {seen:02x?}");
    }
    Ok(())
}
