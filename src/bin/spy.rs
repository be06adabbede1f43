use std::io::BufRead;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use serialdump::config::{DEFAULT_BAUD_RATE, DEFAULT_PORT};
use serialdump::PortSettings;

/// Dump everything a serial device sends, one timestamped line at a time.
/// Handy for checking what a device actually emits before running serial-dump.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = PortSettings {
        path: args.port,
        baud_rate: args.baud,
        ..PortSettings::default()
    };
    let port = match settings.open() {
        Ok(port) => port,
        Err(e) => {
            eprintln!("Unable to open {}: {e}", settings.path);
            return ExitCode::FAILURE;
        }
    };
    log::info!("listening on {} at {} baud", settings.path, settings.baud_rate);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || stop_handler.store(true, Ordering::Relaxed)) {
        log::warn!("unable to install Ctrl-C handler: {e}");
    }

    let format = time::macros::format_description!(
        version = 2,
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
    );
    let mut reader = std::io::BufReader::new(port);
    let mut buf = Vec::new();
    while !stop.load(Ordering::Relaxed) {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                log::info!("{} closed", settings.path);
                break;
            }
            Ok(_) => (),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) =>
            {
                continue;
            }
            Err(e) => {
                eprintln!("Read from {} failed: {e}", settings.path);
                return ExitCode::FAILURE;
            }
        }
        if buf.last() != Some(&b'\n') {
            continue;
        }
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&format)
            .unwrap_or_default();
        // Raw dump: show undecodable bytes rather than bailing.
        println!("{timestamp} {}", String::from_utf8_lossy(&buf).trim_end());
        buf.clear();
    }
    ExitCode::SUCCESS
}
