//! Battery reading snapshot and derived values.

use chrono::{Local, TimeZone};
use serde::Serialize;

/// How the charge direction is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeMode {
    /// The power gauge reports charge status and cell current directly.
    #[default]
    Automatic,
    /// The gauge cannot see the charge direction; current is measured on the
    /// computer-circuit reference and the user switches the status by hand.
    Manual,
}

impl ChargeMode {
    pub fn from_manual_switch(manual_switch: bool) -> Self {
        if manual_switch {
            ChargeMode::Manual
        } else {
            ChargeMode::Automatic
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, ChargeMode::Manual)
    }
}

/// One instantaneous sample of battery electrical state.
///
/// `current` is signed with the charging direction positive. In
/// [`ChargeMode::Manual`] it is the computer-circuit draw, not cell current.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reading {
    /// Acquisition time, epoch seconds.
    pub timestamp: i64,

    /// Whether the battery is charging. `full` implies `charging`.
    pub charging: bool,

    /// Whether the battery reports a full charge.
    pub full: bool,

    /// Terminal voltage in volts.
    pub voltage: f64,

    /// Current in amperes, positive in the charging direction.
    pub current: f64,

    /// Open-circuit voltage estimate in volts, corrected for the
    /// internal-resistance drop. Equals `voltage` while charging in manual
    /// mode, where the cell current is unknown.
    pub effective_voltage: f64,

    /// Remaining capacity percent (0-100), `None` when the gauge cannot be
    /// trusted to report it.
    pub capacity: Option<u8>,

    /// Set by the alarm evaluator once thresholds have been checked.
    pub out_of_range: bool,
}

impl Reading {
    /// A zero-valued reading standing in for a failed acquisition.
    pub fn sentinel(timestamp: i64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Absorbed power of the battery in watts, signed.
    ///
    /// While charging the terminal voltage is the better power reference;
    /// while discharging the resistance-corrected open-circuit voltage is.
    pub fn power(&self) -> f64 {
        if self.current >= 0.0 {
            self.voltage * self.current
        } else {
            self.effective_voltage * self.current
        }
    }

    pub fn status_word(&self) -> &'static str {
        if self.charging {
            if self.full {
                "Full"
            } else {
                "Charging"
            }
        } else {
            "Discharging"
        }
    }

    /// Render the reading as a single console/log line.
    ///
    /// The status word is included for console echo and omitted in the
    /// per-reading session-log dump, where the session header carries it.
    pub fn render_line(&self, with_status: bool) -> String {
        let mut line = format_timestamp(self.timestamp);
        if with_status {
            line.push(' ');
            line.push_str(self.status_word());
        }
        if let Some(capacity) = self.capacity {
            line.push_str(&format!(" {}%,", capacity));
        }
        line.push_str(&format!(" {} V", format_float(self.voltage, 3, false)));
        if self.effective_voltage != self.voltage {
            line.push_str(&format!(
                " (E: {} V)",
                format_float(self.effective_voltage, 3, false)
            ));
        }
        line.push_str(&format!(
            " {} A {} W",
            format_float(self.current, 3, true),
            format_float(self.power(), 3, true)
        ));
        if self.out_of_range {
            line.push_str("   !");
        }
        line
    }
}

/// Format a float with fixed precision and optional forced sign.
///
/// Locale-independent replacement for stream formatting: reports and log
/// files must render the same bytes everywhere.
pub fn format_float(value: f64, precision: usize, force_sign: bool) -> String {
    if force_sign {
        format!("{:+.prec$}", value, prec = precision)
    } else {
        format!("{:.prec$}", value, prec = precision)
    }
}

/// `YYYY-MM-DD HH:MM:SS` in local time.
pub fn format_timestamp(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// `YYYY-MM-DD_HH_MM_SS` in local time, safe for file names.
pub fn format_timestamp_filename(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d_%H_%M_%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
