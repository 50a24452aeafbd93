//! Linux sysfs power-supply backend.
//!
//! Reads the power-gauge files under `/sys/class/power_supply` directly;
//! the kernel exposes voltage/current in microvolts/microamps.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use color_eyre::eyre::{eyre, Result};

use crate::reading::{ChargeMode, Reading};
use crate::source::{BatteryTechnology, PowerSource};

const POWER_SUPPLY_PATH: &str = "/sys/class/power_supply";

const MICRO: f64 = 1_000_000.0;

/// Power source backed by a sysfs power-gauge device.
pub struct SysfsPowerSource {
    device_path: PathBuf,
    mode: ChargeMode,
    internal_resistance: f64,
    charging: bool,
}

impl SysfsPowerSource {
    /// Locate the power-gauge device and verify its files are readable.
    pub fn new(mode: ChargeMode, internal_resistance: f64) -> Result<Self> {
        let device_path = find_gauge_path().ok_or_else(|| {
            eyre!(
                "no power-supply device with voltage_now under {}",
                POWER_SUPPLY_PATH
            )
        })?;

        let mut source = Self {
            device_path,
            mode,
            internal_resistance,
            charging: false,
        };

        if !source.is_valid() {
            return Err(eyre!(
                "power-supply files under {:?} are not readable",
                source.device_path
            ));
        }

        // Prime the charge-status flag from the device; in manual mode the
        // status file is not trustworthy and the flag starts as discharging.
        if !source.mode.is_manual() {
            let _ = source.read();
        }

        Ok(source)
    }

    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    fn read_value(&self, name: &str) -> Option<f64> {
        let content = fs::read_to_string(self.device_path.join(name)).ok()?;
        content.trim().parse::<f64>().ok()
    }

    fn read_string(&self, name: &str) -> Option<String> {
        let content = fs::read_to_string(self.device_path.join(name)).ok()?;
        Some(content.trim().to_string())
    }
}

impl PowerSource for SysfsPowerSource {
    fn is_valid(&self) -> bool {
        ["status", "voltage_now", "current_now"]
            .iter()
            .all(|name| self.device_path.join(name).is_file())
    }

    fn read(&mut self) -> Reading {
        let timestamp = Utc::now().timestamp();
        if !self.is_valid() {
            return Reading::sentinel(timestamp);
        }

        let mut full = false;
        if !self.mode.is_manual() {
            // First character of the status attribute: "Full", "Charging",
            // "Discharging", "Not charging", "Unknown".
            match self
                .read_string("status")
                .and_then(|s| s.chars().next())
                .map(|c| c.to_ascii_lowercase())
            {
                Some('f') => {
                    self.charging = true;
                    full = true;
                }
                Some(c) => self.charging = c == 'c',
                None => self.charging = false,
            }
        }

        let voltage = self.read_value("voltage_now").unwrap_or(0.0) / MICRO;
        let current = self.read_value("current_now").unwrap_or(0.0) / MICRO;

        let capacity = if self.mode.is_manual() {
            None
        } else {
            self.read_value("capacity")
                .map(|v| v.clamp(0.0, 100.0) as u8)
        };

        Reading {
            timestamp,
            charging: self.charging,
            full,
            voltage,
            current,
            effective_voltage: effective_voltage(
                self.mode,
                self.charging,
                voltage,
                current,
                self.internal_resistance,
            ),
            capacity,
            out_of_range: false,
        }
    }

    fn max_voltage_design(&self) -> f64 {
        self.read_value("voltage_max_design").unwrap_or(0.0) / MICRO
    }

    fn technology(&self) -> BatteryTechnology {
        self.read_string("technology")
            .map(|s| BatteryTechnology::from_sysfs(&s))
            .unwrap_or_default()
    }

    fn set_charging(&mut self, charging: bool) {
        self.charging = charging;
    }
}

/// Open-circuit voltage estimate.
///
/// `E = voltage - current * r` holds in both regimes with the charging
/// reference direction: charging (current > 0) pulls the terminal voltage
/// above E, discharging (current < 0) drops it below. While charging in
/// manual mode the cell current is unknown and E falls back to the terminal
/// voltage.
pub(crate) fn effective_voltage(
    mode: ChargeMode,
    charging: bool,
    voltage: f64,
    current: f64,
    internal_resistance: f64,
) -> f64 {
    if mode.is_manual() && charging {
        voltage
    } else {
        voltage - current * internal_resistance
    }
}

fn find_gauge_path() -> Option<PathBuf> {
    let power_supply = Path::new(POWER_SUPPLY_PATH);
    if !power_supply.exists() {
        return None;
    }

    if let Ok(entries) = fs::read_dir(power_supply) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.join("voltage_now").is_file() {
                return Some(path);
            }
        }
    }
    None
}
