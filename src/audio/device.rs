// Output device lookup

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

pub struct OutputDeviceManager {
    host: Host,
}

impl OutputDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Every output device the host reports
    pub fn list_output_devices(&self) -> Vec<OutputDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        let mut devices = Vec::new();
        if let Ok(output_devices) = self.host.output_devices() {
            for device in output_devices {
                if let Ok(name) = device.name() {
                    let is_default = name == default_name;
                    devices.push(OutputDeviceInfo { name, is_default });
                }
            }
        }
        devices
    }

    /// Named device, or the host default when `name` is `None`
    pub fn find_output_device(&self, name: Option<&str>) -> Option<Device> {
        match name {
            None => self.host.default_output_device(),
            Some(wanted) => {
                let devices = self.host.output_devices().ok()?;
                for device in devices {
                    if let Ok(name) = device.name()
                        && name == wanted
                    {
                        return Some(device);
                    }
                }
                log::warn!("Output device '{}' not found", wanted);
                None
            }
        }
    }
}

impl Default for OutputDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
