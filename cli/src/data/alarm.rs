//! Threshold evaluation for a single reading.

use voltwatch_platform::{BatteryLimits, ChargeMode, Reading};

use crate::config::AlarmConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmDecision {
    /// The reading left the configured envelope; counted in session stats.
    pub out_of_range: bool,
    /// The breach is relevant for the current charge direction; the monitor
    /// rings the terminal bell once per such reading.
    pub should_sound: bool,
}

/// Check one reading against the configured safe envelope.
///
/// Pure function of the reading, the config and the device limits.
pub fn evaluate(reading: &Reading, config: &AlarmConfig, limits: &BatteryLimits) -> AlarmDecision {
    let mode = ChargeMode::from_manual_switch(config.manual_switch);

    let under_voltage = reading.voltage < config.min_voltage;
    let over_voltage = reading.effective_voltage > config.max_voltage;
    let over_design =
        limits.max_voltage_design > 0.0 && reading.voltage > limits.max_voltage_design;
    let over_power = reading.power().abs() > config.max_power;

    let out_of_range = under_voltage || over_voltage || over_design || over_power;
    if !out_of_range {
        return AlarmDecision::default();
    }

    // A voltage dip only matters while the battery actually supplies the
    // load, and a high effective voltage only while it absorbs charge; the
    // hard design limit and the power ceiling hold in both directions.
    let discharging = match mode {
        ChargeMode::Automatic => !reading.charging,
        ChargeMode::Manual => !reading.charging && reading.current < 0.0,
    };
    let should_sound = (discharging && under_voltage)
        || (reading.charging && over_voltage)
        || over_design
        || over_power;

    AlarmDecision {
        out_of_range,
        should_sound,
    }
}
