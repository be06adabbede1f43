use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: &str = "COM4";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_SAMPLE_COUNT: usize = 1000;
pub const DEFAULT_OUTPUT_PATH: &str = "output.txt";

#[derive(Clone, Debug, PartialEq)]
pub struct PortSettings {
    pub path: String,
    pub baud_rate: u32,
    /// How long a single read may block. This is not a device timeout: running
    /// into it is harmless, it only bounds how long we take to notice a
    /// cancellation request.
    pub poll_interval: Duration,
}

impl Default for PortSettings {
    fn default() -> PortSettings {
        PortSettings {
            path: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl PortSettings {
    pub fn open(&self) -> serialport::Result<Box<dyn serialport::SerialPort>> {
        // Plain 8N1 without handshaking, which is what virtually every
        // microcontroller UART / USB-CDC bridge defaults to.
        serialport::new(&self.path, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.poll_interval)
            .open()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AcquisitionConfig {
    pub port: PortSettings,
    pub sample_count: usize,
    pub output_path: PathBuf,
}

impl Default for AcquisitionConfig {
    fn default() -> AcquisitionConfig {
        AcquisitionConfig {
            port: PortSettings::default(),
            sample_count: DEFAULT_SAMPLE_COUNT,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port.path.is_empty() {
            return Err(Error::InvalidConfig(
                "port path must not be empty".to_string(),
            ));
        }
        if self.port.baud_rate == 0 {
            return Err(Error::InvalidConfig(
                "baud rate must be at least 1".to_string(),
            ));
        }
        if self.sample_count == 0 {
            return Err(Error::InvalidConfig(
                "sample count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
