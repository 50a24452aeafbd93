//! Power source trait and static battery limits.

use std::fmt;

use crate::reading::Reading;

/// Battery technology/chemistry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryTechnology {
    /// Lithium-ion
    LithiumIon,
    /// Lithium-polymer
    LithiumPolymer,
    /// Lithium iron phosphate
    LithiumIronPhosphate,
    /// Nickel-metal hydride
    NickelMetalHydride,
    /// Nickel-cadmium
    NickelCadmium,
    /// Unknown or unreported technology
    #[default]
    Unknown,
}

impl BatteryTechnology {
    /// Parse the sysfs `technology` attribute value.
    pub fn from_sysfs(value: &str) -> Self {
        match value.trim() {
            "Li-ion" => BatteryTechnology::LithiumIon,
            "Li-poly" => BatteryTechnology::LithiumPolymer,
            "LiFe" => BatteryTechnology::LithiumIronPhosphate,
            "NiMH" => BatteryTechnology::NickelMetalHydride,
            "NiCd" => BatteryTechnology::NickelCadmium,
            _ => BatteryTechnology::Unknown,
        }
    }

    /// Returns a human-readable label for the battery technology.
    pub fn label(&self) -> &'static str {
        match self {
            BatteryTechnology::LithiumIon => "Li-ion",
            BatteryTechnology::LithiumPolymer => "Li-poly",
            BatteryTechnology::LithiumIronPhosphate => "LiFe",
            BatteryTechnology::NickelMetalHydride => "NiMH",
            BatteryTechnology::NickelCadmium => "NiCd",
            BatteryTechnology::Unknown => "Unknown",
        }
    }

    /// Returns true for lithium chemistries, which the default alarm
    /// thresholds are calibrated for.
    pub fn is_lithium(&self) -> bool {
        matches!(
            self,
            BatteryTechnology::LithiumIon
                | BatteryTechnology::LithiumPolymer
                | BatteryTechnology::LithiumIronPhosphate
        )
    }
}

impl fmt::Display for BatteryTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Static limits reported by the battery device.
#[derive(Debug, Clone, Default)]
pub struct BatteryLimits {
    /// Designed maximum terminal voltage in volts, 0.0 when unreported.
    pub max_voltage_design: f64,

    /// Battery chemistry.
    pub technology: BatteryTechnology,
}

/// A device that produces battery readings on demand.
pub trait PowerSource {
    /// Whether the underlying device files are present and readable.
    /// The monitor refuses to start when this is false.
    fn is_valid(&self) -> bool;

    /// Acquire one reading. Never fails: an unreadable device yields a
    /// zero-valued sentinel reading instead.
    fn read(&mut self) -> Reading;

    /// Designed maximum terminal voltage in volts, 0.0 when unreported.
    fn max_voltage_design(&self) -> f64;

    /// Battery chemistry as reported by the device.
    fn technology(&self) -> BatteryTechnology;

    /// Override the charge-status flag. Meaningful only in manual mode,
    /// where the gauge cannot see the charge direction.
    fn set_charging(&mut self, charging: bool);

    fn limits(&self) -> BatteryLimits {
        BatteryLimits {
            max_voltage_design: self.max_voltage_design(),
            technology: self.technology(),
        }
    }

    /// Check if a battery is present on this system at all.
    fn is_available() -> bool
    where
        Self: Sized,
    {
        use starship_battery::Manager;
        Manager::new()
            .ok()
            .and_then(|m| m.batteries().ok())
            .and_then(|mut b| b.next())
            .and_then(|b| b.ok())
            .is_some()
    }
}
