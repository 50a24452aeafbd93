//! Session summary and its terminal rendering.

use std::time::Duration;

use voltwatch_platform::{format_float, format_timestamp, ChargeMode};

/// Read-only summary of a flushed session.
///
/// Computed once per flush from the (possibly trimmed) reading buffer and
/// the running sums; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub mode: ChargeMode,
    /// Charge direction shared by every reading of the session.
    pub charging: bool,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub span_secs: i64,
    pub sample_count: usize,
    pub out_of_range_percent: f64,
    pub start_effective_voltage: f64,
    pub end_effective_voltage: f64,
    pub start_capacity: Option<u8>,
    pub end_capacity: Option<u8>,
    pub delta_capacity: Option<i32>,
    /// Energy integrated over the session, watt-hours, signed.
    pub energy_wh: f64,
    /// Charge transferred, milliamp-hours, signed.
    pub charge_mah: f64,
    /// Energy wasted on the internal resistance, watt-hours, never negative.
    pub resistive_loss_wh: f64,
    /// `energy_wh` net of the resistive loss while charging; while
    /// discharging the integral is already cell-referenced and unchanged.
    pub net_energy_wh: f64,
    pub average_power_w: f64,
    /// Average resistive-loss power, absent when the loss cannot be
    /// attributed to the cell (charging in manual mode).
    pub average_resistive_power_w: Option<f64>,
    /// Power sample with the largest magnitude, sign preserved.
    pub peak_power_w: f64,
    /// Charge efficiency percent, present when meaningful and below 100.
    pub efficiency_percent: Option<i32>,
    /// Full-capacity extrapolation, present when the capacity moved at
    /// least 5 points over the session.
    pub estimated_full_wh: Option<f64>,
    pub estimated_full_mah: Option<f64>,
}

impl SessionReport {
    pub fn direction_word(&self) -> &'static str {
        if self.charging {
            "Charging"
        } else {
            "Discharging"
        }
    }

    /// Multi-line human-readable report, shared by console and log files.
    pub fn render(&self) -> String {
        let span = Duration::from_secs(self.span_secs.max(0) as u64);
        let capacity_note = |capacity: Option<u8>| {
            capacity
                .map(|c| format!(" ({}%)", c))
                .unwrap_or_default()
        };

        let mut out = format!(
            "{} for {} (out of range in {}% of samples)\n",
            self.direction_word(),
            humantime::format_duration(span),
            self.out_of_range_percent.round() as i64,
        );
        out.push_str(&format!(
            "from {} to {},\n",
            format_timestamp(self.start_timestamp),
            format_timestamp(self.end_timestamp),
        ));
        out.push_str(&format!(
            "battery voltage changed from {} V{} to {} V{},\n",
            format_float(self.start_effective_voltage, 3, false),
            capacity_note(self.start_capacity),
            format_float(self.end_effective_voltage, 3, false),
            capacity_note(self.end_capacity),
        ));

        out.push_str(&format!(
            "average power {} W (peak {} W)",
            format_float(self.average_power_w, 3, true),
            format_float(self.peak_power_w, 3, true),
        ));
        if let Some(resistive_power) = self.average_resistive_power_w {
            out.push_str(&format!(
                ", resistive loss {} Wh (average {} W)",
                format_float(self.resistive_loss_wh, 3, false),
                format_float(resistive_power, 3, false),
            ));
        }
        out.push_str(",\n");

        let mah = self.charge_mah.abs().round() as i64;
        if self.energy_wh > 0.0 {
            if self.mode.is_manual() {
                out.push_str(&format!(
                    "{} Wh (about {} mAh) of energy spent.\n",
                    format_float(self.energy_wh.abs(), 3, false),
                    mah,
                ));
            } else {
                out.push_str(&format!(
                    "{} Wh (about {} mAh) charged.\n",
                    format_float(self.net_energy_wh, 3, false),
                    mah,
                ));
            }
        } else {
            out.push_str(&format!(
                "{} Wh (about {} mAh) discharged.\n",
                format_float(self.energy_wh.abs(), 3, false),
                mah,
            ));
        }

        if let Some(efficiency) = self.efficiency_percent {
            out.push_str(&format!("charge efficiency: {}%\n", efficiency));
        }
        if let (Some(full_wh), Some(full_mah)) = (self.estimated_full_wh, self.estimated_full_mah)
        {
            out.push_str(&format!(
                "estimated full capacity: {} Wh ({} mAh)\n",
                format_float(full_wh, 2, false),
                full_mah.round() as i64,
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discharge_report() -> SessionReport {
        SessionReport {
            mode: ChargeMode::Automatic,
            charging: false,
            start_timestamp: 1_700_000_000,
            end_timestamp: 1_700_003_600,
            span_secs: 3600,
            sample_count: 720,
            out_of_range_percent: 2.4,
            start_effective_voltage: 3.92,
            end_effective_voltage: 3.81,
            start_capacity: Some(80),
            end_capacity: Some(70),
            delta_capacity: Some(-10),
            energy_wh: -3.0,
            charge_mah: -800.0,
            resistive_loss_wh: 0.12,
            net_energy_wh: -3.0,
            average_power_w: -3.0,
            average_resistive_power_w: Some(0.12),
            peak_power_w: -4.2,
            efficiency_percent: None,
            estimated_full_wh: Some(30.0),
            estimated_full_mah: Some(8000.0),
        }
    }

    #[test]
    fn test_render_discharge_report() {
        let text = discharge_report().render();
        assert!(text.starts_with("Discharging for 1h"));
        assert!(text.contains("(out of range in 2% of samples)"));
        assert!(text.contains("from 3.920 V (80%) to 3.810 V (70%)"));
        assert!(text.contains("average power -3.000 W (peak -4.200 W)"));
        assert!(text.contains("3.000 Wh (about 800 mAh) discharged."));
        assert!(text.contains("estimated full capacity: 30.00 Wh (8000 mAh)"));
    }

    #[test]
    fn test_render_charge_report_uses_net_energy() {
        let mut report = discharge_report();
        report.charging = true;
        report.energy_wh = 3.12;
        report.net_energy_wh = 3.0;
        report.charge_mah = 800.0;
        report.average_power_w = 3.12;
        report.peak_power_w = 3.8;
        report.efficiency_percent = Some(96);
        report.estimated_full_wh = None;
        report.estimated_full_mah = None;

        let text = report.render();
        assert!(text.starts_with("Charging for"));
        assert!(text.contains("3.000 Wh (about 800 mAh) charged."));
        assert!(text.contains("charge efficiency: 96%"));
        assert!(!text.contains("estimated full capacity"));
    }

    #[test]
    fn test_render_manual_charge_report_counts_circuit_energy() {
        let mut report = discharge_report();
        report.mode = ChargeMode::Manual;
        report.charging = true;
        report.energy_wh = 2.5;
        report.net_energy_wh = 2.5;
        report.average_resistive_power_w = None;
        report.start_capacity = None;
        report.end_capacity = None;
        report.estimated_full_wh = None;
        report.estimated_full_mah = None;

        let text = report.render();
        assert!(text.contains("of energy spent."));
        assert!(!text.contains("resistive loss"));
        assert!(!text.contains("(80%)"));
    }
}
