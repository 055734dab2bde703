use std::fmt;
use std::io::{self, Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use crate::error::LinkError;

/// The controller console only runs at this rate.
pub const BAUD: u32 = 115_200;
/// Per-call read timeout; reads poll rather than block.
pub const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Read half of a link, owned by the reader thread.
pub trait ByteSource: Send {
    /// Bytes that can be read right now without waiting.
    fn bytes_available(&mut self) -> io::Result<usize>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl ByteSource for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }
}

/// Both halves of a freshly opened link.
pub struct OpenedPort {
    pub reader: Box<dyn ByteSource>,
    pub writer: Box<dyn Write + Send>,
}

pub trait PortOpener {
    fn open(&self, dev: &str, baud: u32) -> Result<OpenedPort, LinkError>;
}

/// A candidate device as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Identifier accepted by [`PortOpener::open`]
    pub name: String,
    pub detail: Option<String>,
}

impl fmt::Display for PortEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.name, detail),
            None => f.write_str(&self.name),
        }
    }
}

pub trait PortEnumerator {
    fn ports(&self) -> io::Result<Vec<PortEntry>>;
}

/// Real serial devices via the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerial;

impl PortOpener for SystemSerial {
    fn open(&self, dev: &str, baud: u32) -> Result<OpenedPort, LinkError> {
        let unavailable = |e: serialport::Error| LinkError::PortUnavailable {
            port: dev.to_string(),
            source: e.into(),
        };
        let port = open_port(dev, baud).map_err(unavailable)?;
        // Independent handle so reads and writes never share one object
        let reader = port.try_clone().map_err(unavailable)?;
        Ok(OpenedPort {
            reader: Box::new(reader),
            writer: Box::new(port),
        })
    }
}

impl PortEnumerator for SystemSerial {
    fn ports(&self) -> io::Result<Vec<PortEntry>> {
        let ports = serialport::available_ports()?;
        Ok(ports.iter().map(entry).collect())
    }
}

pub fn open_port(dev: &str, baud: u32) -> serialport::Result<Box<dyn SerialPort>> {
    serialport::new(dev, baud)
        .timeout(READ_TIMEOUT)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open()
}

fn entry(info: &serialport::SerialPortInfo) -> PortEntry {
    let detail = match &info.port_type {
        SerialPortType::UsbPort(usb) => Some(match &usb.product {
            Some(product) => product.clone(),
            None => format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
        }),
        _ => None,
    };
    PortEntry {
        name: info.port_name.clone(),
        detail,
    }
}

/// `ports` subcommand.
pub fn run_list(ports: &dyn PortEnumerator) -> Result<()> {
    let found = ports.ports().context("listing serial ports")?;
    if found.is_empty() {
        eprintln!("no serial ports found");
    }
    for port in found {
        println!("{port}");
    }
    Ok(())
}
