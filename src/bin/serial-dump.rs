use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use serialdump::config::{
    DEFAULT_BAUD_RATE, DEFAULT_OUTPUT_PATH, DEFAULT_PORT, DEFAULT_SAMPLE_COUNT,
};
use serialdump::{AcquisitionConfig, Outcome, PortSettings};

/// Read comma-separated samples from a serial port and write them to a file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial device, e.g. /dev/ttyUSB0 or COM4.
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Number of samples (lines of three values) to collect.
    #[arg(short = 'n', long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    count: usize,

    /// Destination file, overwritten if it exists.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// List available serial ports and exit.
    #[arg(long)]
    list_ports: bool,
}

fn list_ports() -> ExitCode {
    match serialport::available_ports() {
        Ok(ports) if ports.is_empty() => {
            eprintln!("No serial ports found.");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in ports {
                match port.port_type {
                    serialport::SerialPortType::UsbPort(info) => println!(
                        "{}\tUSB {:04x}:{:04x} {}",
                        port.port_name,
                        info.vid,
                        info.pid,
                        info.product.unwrap_or_default()
                    ),
                    _ => println!("{}", port.port_name),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to enumerate serial ports: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.list_ports {
        return list_ports();
    }

    let config = AcquisitionConfig {
        port: PortSettings {
            path: args.port,
            baud_rate: args.baud,
            ..PortSettings::default()
        },
        sample_count: args.count,
        output_path: args.output,
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    }) {
        log::warn!("unable to install Ctrl-C handler: {e}");
    }

    match serialdump::run_to_file(&config, &cancel) {
        Ok(Outcome::Complete(samples)) => {
            eprintln!(
                "Wrote {} samples to {}",
                samples.len(),
                config.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Ok(Outcome::Cancelled(samples)) => {
            eprintln!(
                "Interrupted: wrote {} of {} samples to {}",
                samples.len(),
                config.sample_count,
                config.output_path.display()
            );
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("serial-dump failed: {e}");
            ExitCode::FAILURE
        }
    }
}
