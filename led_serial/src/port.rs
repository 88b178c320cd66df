//! Finding the Arduino among the system's serial ports.

use serialport::SerialPortType;

use crate::link::LinkError;

/// Serial port as seen by detection: device path plus whatever USB strings
/// the OS reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortCandidate {
    pub device:      String,
    pub description: String,
}

impl PortCandidate {
    pub fn new(device: &str, description: &str) -> Self {
        PortCandidate { device: device.to_string(), description: description.to_string() }
    }

    fn looks_like_arduino(&self) -> bool {
        let dev  = self.device.to_lowercase();
        let desc = self.description.to_lowercase();
        dev.contains("acm") || desc.contains("arduino") || desc.contains("cdc")
    }

    fn looks_like_usb_serial(&self) -> bool {
        self.device.to_lowercase().contains("usb")
    }
}

/// Pick the most Arduino-like port.
///
/// CDC-ACM devices and anything describing itself as an Arduino come first;
/// a generic USB-serial adapter is the second choice.
pub fn pick_arduino(candidates: &[PortCandidate]) -> Option<&PortCandidate> {
    candidates.iter().find(|c| c.looks_like_arduino())
        .or_else(|| candidates.iter().find(|c| c.looks_like_usb_serial()))
}

/// Every serial port the OS knows about.
pub fn available_candidates() -> Result<Vec<PortCandidate>, LinkError> {
    let ports = serialport::available_ports().map_err(LinkError::Enumerate)?;
    Ok(ports.into_iter().map(|p| {
        let description = match p.port_type {
            SerialPortType::UsbPort(usb) => {
                let parts: Vec<String> = [usb.product, usb.manufacturer]
                    .into_iter()
                    .flatten()
                    .collect();
                parts.join(" ")
            }
            SerialPortType::PciPort       => "pci".to_string(),
            SerialPortType::BluetoothPort => "bluetooth".to_string(),
            SerialPortType::Unknown       => String::new(),
        };
        PortCandidate { device: p.port_name, description }
    }).collect())
}

/// Detect the Arduino's device path.
pub fn detect_arduino() -> Result<Option<String>, LinkError> {
    let candidates = available_candidates()?;
    for c in &candidates {
        tracing::debug!(device = %c.device, description = %c.description, "serial port");
    }
    let found = pick_arduino(&candidates).map(|c| c.device.clone());
    match &found {
        Some(dev) => tracing::info!(port = %dev, "Arduino detected"),
        None      => tracing::warn!(ports = candidates.len(), "no Arduino-like serial port found"),
    }
    Ok(found)
}
