//! Flow-meter board daemon: answer the host over a KBSP serial link.
//!
//! Usage: cargo run --example daemon -- --device /tmp/ttysKEG2
//!
//! Drains incoming commands, replies to Ping with Hello, tracks output and
//! serial-number commands, and periodically reports meter readings.
//! Set `RUST_LOG=kbsp=trace` to see every frame.

use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use kbsp::config::{DEFAULT_PATH, DEFAULT_SPEED};
use kbsp::{Identity, Message, MeterCounter, Reader, ReaderConfig, ReaderError, Responder};

#[derive(Debug, Parser)]
#[command(about = "Serve a KBSP controller link")]
struct Args {
    /// Serial device path
    #[arg(long, default_value = DEFAULT_PATH)]
    device: String,

    /// Serial speed (baud)
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    speed: u32,

    /// Serial number reported in Hello
    #[arg(long, default_value = "flow0")]
    serial: String,

    /// Seconds between meter reports (0 disables)
    #[arg(long, default_value_t = 5)]
    report_secs: u64,

    /// Meter names to report
    #[arg(long, default_values = ["flow0", "flow1"])]
    meter: Vec<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), ReaderError> {
    let config = ReaderConfig::new(&args.device).speed(args.speed);
    let mut reader = Reader::serial(&config);

    // Nothing sets this in the demo; a signal handler or GPIO watchdog would.
    let stop = Arc::new(AtomicBool::new(false));
    reader.set_shutdown_flag(Arc::clone(&stop));
    reader.set_on_recv(|m| println!("<< {m:?}"));
    reader.set_on_send(|m| println!(">> {m:?} [{}]", m.debug_hex()));

    println!("Opening {reader}...");
    reader.open()?;

    let mut responder = Responder::new(Identity {
        serial_number: args.serial.clone(),
        ..Identity::default()
    });
    let meters: Vec<MeterCounter> = args.meter.iter().map(MeterCounter::new).collect();
    let report_every = Duration::from_secs(args.report_secs);
    let mut last_report = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        for message in responder.poll(&mut reader)? {
            match message {
                Message::SetOutput(_) => println!("outputs: {:?}", responder.outputs()),
                Message::SetSerialNumber(_) => {
                    println!("serial number now {}", responder.identity().serial_number)
                }
                _ => {}
            }
        }

        if !report_every.is_zero() && last_report.elapsed() >= report_every {
            let refs: Vec<&MeterCounter> = meters.iter().collect();
            responder.report_meters(&mut reader, &refs)?;
            last_report = Instant::now();
        }

        thread::sleep(config.poll_interval);
    }

    let stats = reader.stats();
    println!(
        "{} messages, {} dropped ({} bad checksum)",
        stats.messages,
        stats.dropped(),
        stats.checksum_errors,
    );
    reader.close_quietly();
    Ok(())
}
