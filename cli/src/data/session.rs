//! Session accounting: groups readings into charge/discharge sessions and
//! integrates energy statistics over them.

use voltwatch_platform::{ChargeMode, Reading};

use crate::data::report::SessionReport;

/// Sampling cadence of the monitor loop, seconds.
pub const POLL_INTERVAL_SECS: i64 = 5;

/// Elapsed time between two readings is clamped to this; a longer gap means
/// the host was suspended and the session must end.
pub const GAP_CLAMP_SECS: i64 = 5 * POLL_INTERVAL_SECS;

/// Buffer cap: 0x20000 readings at 32 bytes each is about 4 MiB.
const MAX_READINGS: usize = 0x20000;

/// Sessions with fewer readings than this are discarded as noise.
const MIN_READINGS: usize = 5;

/// Manual-mode debounce: lookback distance in samples (about 15 s),
/// the voltage divergence that marks trailing readings as stale, and the
/// most readings ever trimmed from the tail.
const DEBOUNCE_LOOKBACK: usize = 3;
const DEBOUNCE_DELTA_VOLTS: f64 = 0.1;
const DEBOUNCE_MAX_TRIM: usize = 2;

/// Minimum capacity swing (percent points) for a full-capacity estimate.
const CAPACITY_ESTIMATE_MIN_DELTA: i32 = 5;

/// What ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushCause {
    BufferFull,
    PolarityFlip,
    SleepGap,
    Shutdown,
}

/// A completed session handed to the report sink.
#[derive(Debug)]
pub struct SessionFlush {
    pub report: SessionReport,
    /// The (possibly debounce-trimmed) readings of the session.
    pub readings: Vec<Reading>,
    pub cause: FlushCause,
}

/// Stateful core of the monitor: consumes the reading stream, detects
/// session boundaries and produces flush summaries.
///
/// Not reentrant; must only be driven by the single polling thread.
pub struct SessionAccumulator {
    mode: ChargeMode,
    readings: Vec<Reading>,
    /// Charge direction shared by the buffered readings.
    charging: bool,
    energy_wh: f64,
    charge_ah: f64,
    resistive_wh: f64,
    peak_power: f64,
    out_of_range_count: usize,
}

impl SessionAccumulator {
    pub fn new(mode: ChargeMode) -> Self {
        Self {
            mode,
            readings: Vec::new(),
            charging: false,
            energy_wh: 0.0,
            charge_ah: 0.0,
            resistive_wh: 0.0,
            peak_power: 0.0,
            out_of_range_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Feed one reading into the current session.
    ///
    /// Returns a flush when this reading ended a session. Sessions shorter
    /// than [`MIN_READINGS`] are discarded and return nothing.
    pub fn ingest(&mut self, reading: Reading, shutdown: bool) -> Option<SessionFlush> {
        if self.readings.is_empty() {
            self.seed(reading);
            if shutdown {
                return self.take_flush(FlushCause::Shutdown);
            }
            return None;
        }
        let last = &self.readings[self.readings.len() - 1];

        // Integrate the previous reading's power and current, held constant
        // over the elapsed interval. The clamp keeps a post-suspend reading
        // from attributing hours of wall time to one sample.
        let elapsed = reading.timestamp - last.timestamp;
        let gap = elapsed > GAP_CLAMP_SECS;
        let hours = elapsed.clamp(0, GAP_CLAMP_SECS) as f64 / 3600.0;

        self.energy_wh += last.power() * hours;
        self.charge_ah += last.current * hours;
        if !self.mode.is_manual() || !last.charging {
            self.resistive_wh +=
                (last.effective_voltage - last.voltage).abs() * last.current.abs() * hours;
        }

        if reading.charging != self.charging {
            // The arrived reading belongs to the next session.
            let flush = self.take_flush(FlushCause::PolarityFlip);
            self.seed(reading);
            return flush;
        }

        self.push(reading);

        if self.readings.len() >= MAX_READINGS {
            return self.take_flush(FlushCause::BufferFull);
        }
        if gap {
            return self.take_flush(FlushCause::SleepGap);
        }
        if shutdown {
            return self.take_flush(FlushCause::Shutdown);
        }
        None
    }

    fn seed(&mut self, reading: Reading) {
        self.charging = reading.charging;
        self.push(reading);
    }

    fn push(&mut self, reading: Reading) {
        if reading.power().abs() > self.peak_power.abs() {
            self.peak_power = reading.power();
        }
        if reading.out_of_range {
            self.out_of_range_count += 1;
        }
        self.readings.push(reading);
    }

    fn take_flush(&mut self, cause: FlushCause) -> Option<SessionFlush> {
        if self.readings.len() < MIN_READINGS {
            self.reset();
            return None;
        }

        if self.mode.is_manual() {
            self.debounce_trim();
        }

        let report = self.build_report();
        let readings = std::mem::take(&mut self.readings);
        self.reset();

        Some(SessionFlush {
            report,
            readings,
            cause,
        })
    }

    /// Drop trailing readings recorded after the battery state changed but
    /// before the user switched the manual status: the last reading is
    /// compared against the one three samples (about 15 s) earlier, and
    /// while they diverge by 0.1 V or more the tail is stale.
    fn debounce_trim(&mut self) {
        let mut removed = 0;
        while removed < DEBOUNCE_MAX_TRIM && self.readings.len() > DEBOUNCE_LOOKBACK {
            let len = self.readings.len();
            let reference = &self.readings[len - 1 - DEBOUNCE_LOOKBACK];
            let divergence = (self.readings[len - 1].voltage - reference.voltage).abs();
            if divergence < DEBOUNCE_DELTA_VOLTS {
                break;
            }
            if let Some(dropped) = self.readings.pop() {
                if dropped.out_of_range {
                    self.out_of_range_count -= 1;
                }
                removed += 1;
            }
        }
    }

    fn build_report(&self) -> SessionReport {
        let first = &self.readings[0];
        let last = &self.readings[self.readings.len() - 1];

        let span_secs = last.timestamp - first.timestamp;
        let span_hours = span_secs as f64 / 3600.0;
        let count = self.readings.len();

        let delta_capacity = first
            .capacity
            .zip(last.capacity)
            .map(|(start, end)| end as i32 - start as i32);

        let net_energy_wh = if self.energy_wh > 0.0 {
            self.energy_wh - self.resistive_wh
        } else {
            self.energy_wh
        };

        let resistive_applicable = !self.mode.is_manual() || !self.charging;
        let average_resistive_power_w = (resistive_applicable && span_secs > 0)
            .then(|| self.resistive_wh / span_hours);

        // Below one the loss fraction is a meaningful efficiency; for
        // discharge sessions the quotient lands above 100 and is dropped.
        let efficiency_percent = if self.energy_wh < 0.0
            || (self.energy_wh > 0.0 && !self.mode.is_manual())
        {
            let percent = ((1.0 - self.resistive_wh / self.energy_wh) * 100.0).round() as i32;
            (percent < 100).then_some(percent)
        } else {
            None
        };

        let estimate = delta_capacity
            .filter(|delta| delta.abs() >= CAPACITY_ESTIMATE_MIN_DELTA)
            .map(|delta| {
                (
                    net_energy_wh * 100.0 / delta as f64,
                    self.charge_ah * 1000.0 * 100.0 / delta as f64,
                )
            });

        SessionReport {
            mode: self.mode,
            charging: self.charging,
            start_timestamp: first.timestamp,
            end_timestamp: last.timestamp,
            span_secs,
            sample_count: count,
            out_of_range_percent: 100.0 * self.out_of_range_count as f64 / count as f64,
            start_effective_voltage: first.effective_voltage,
            end_effective_voltage: last.effective_voltage,
            start_capacity: first.capacity,
            end_capacity: last.capacity,
            delta_capacity,
            energy_wh: self.energy_wh,
            charge_mah: self.charge_ah * 1000.0,
            resistive_loss_wh: self.resistive_wh,
            net_energy_wh,
            average_power_w: if span_secs > 0 {
                self.energy_wh / span_hours
            } else {
                0.0
            },
            average_resistive_power_w,
            peak_power_w: self.peak_power,
            efficiency_percent,
            estimated_full_wh: estimate.map(|(wh, _)| wh),
            estimated_full_mah: estimate.map(|(_, mah)| mah),
        }
    }

    fn reset(&mut self) {
        self.readings.clear();
        self.energy_wh = 0.0;
        self.charge_ah = 0.0;
        self.resistive_wh = 0.0;
        self.peak_power = 0.0;
        self.out_of_range_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(timestamp: i64, charging: bool, voltage: f64, current: f64) -> Reading {
        Reading {
            timestamp,
            charging,
            voltage,
            current,
            effective_voltage: voltage,
            ..Reading::default()
        }
    }

    fn discharge_at(timestamp: i64) -> Reading {
        // E == voltage, so power() is voltage * current = -3.6 W
        reading(timestamp, false, 3.6, -1.0)
    }

    #[test]
    fn test_sessions_share_one_charge_direction() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        for i in 0..6 {
            assert!(acc.ingest(discharge_at(i * 5), false).is_none());
        }
        let flush = acc
            .ingest(reading(30, true, 4.0, 0.5), false)
            .expect("polarity flip must flush");

        assert_eq!(flush.cause, FlushCause::PolarityFlip);
        assert_eq!(flush.readings.len(), 6);
        assert!(flush.readings.iter().all(|r| !r.charging));
        assert!(!flush.report.charging);

        // The flip reading seeds the next session.
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_gap_is_clamped_and_forces_flush() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        for i in 0..6 {
            assert!(acc.ingest(discharge_at(i * 5), false).is_none());
        }
        // 600 s of wall time since the previous reading: integrate at most
        // 25 s of it, then close the session.
        let flush = acc
            .ingest(discharge_at(625), false)
            .expect("sleep gap must flush");

        assert_eq!(flush.cause, FlushCause::SleepGap);
        assert_eq!(flush.readings.len(), 7);
        // 5 intervals of 5 s plus the clamped 25 s: 50 s at -3.6 W.
        assert!((flush.report.energy_wh - (-3.6 * 50.0 / 3600.0)).abs() < 1e-9);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_short_session_is_discarded() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        for i in 0..3 {
            assert!(acc.ingest(discharge_at(i * 5), false).is_none());
        }
        assert!(acc.ingest(discharge_at(15), true).is_none());
        assert!(acc.is_empty());
    }

    #[test]
    fn test_buffer_cap_forces_flush() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        let mut flushed = None;
        for i in 0..(MAX_READINGS as i64) {
            if let Some(flush) = acc.ingest(discharge_at(i * 5), false) {
                flushed = Some(flush);
                break;
            }
        }
        let flush = flushed.expect("buffer cap must flush");
        assert_eq!(flush.cause, FlushCause::BufferFull);
        assert_eq!(flush.readings.len(), MAX_READINGS);
    }

    #[test]
    fn test_resistive_loss_is_never_negative() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        for i in 0..8 {
            let mut r = reading(i * 5, false, 3.6, -1.2);
            r.effective_voltage = 3.72; // 0.1 ohm drop
            assert!(acc.ingest(r, false).is_none());
        }
        let flush = acc.ingest(discharge_at(40), true).expect("shutdown flush");

        assert!(flush.report.resistive_loss_wh >= 0.0);
        // 8 intervals of 5 s, each integrating the previous reading's
        // 0.12 V drop at 1.2 A.
        let expected = 0.12 * 1.2 * (8.0 * 5.0) / 3600.0;
        assert!((flush.report.resistive_loss_wh - expected).abs() < 1e-9);
    }

    #[test]
    fn test_full_capacity_estimate_from_capacity_swing() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        // One hour at -3.0 W (E 3.75 V, -0.8 A), capacity falling 80 -> 70.
        let mut flushed = None;
        for i in 0..=180i64 {
            let mut r = reading(i * 20, false, 3.75, -0.8);
            r.capacity = Some((80.0 - i as f64 * 10.0 / 180.0).round() as u8);
            let shutdown = i == 180;
            if let Some(flush) = acc.ingest(r, shutdown) {
                flushed = Some(flush);
            }
        }
        let report = flushed.expect("shutdown flush").report;

        assert_eq!(report.delta_capacity, Some(-10));
        assert!((report.energy_wh - -3.0).abs() < 1e-6);
        assert!((report.average_power_w - -3.0).abs() < 1e-6);
        assert!((report.peak_power_w - -3.0).abs() < 1e-9);
        assert!((report.estimated_full_wh.unwrap() - 30.0).abs() < 1e-6);
        assert!((report.estimated_full_mah.unwrap() - 8000.0).abs() < 1e-3);
    }

    #[test]
    fn test_no_estimate_below_capacity_threshold() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        let mut flushed = None;
        for i in 0..10i64 {
            let mut r = discharge_at(i * 5);
            r.capacity = Some(80 - (i >= 5) as u8); // 80 -> 79
            if let Some(flush) = acc.ingest(r, i == 9) {
                flushed = Some(flush);
            }
        }
        let report = flushed.expect("shutdown flush").report;
        assert_eq!(report.delta_capacity, Some(-1));
        assert!(report.estimated_full_wh.is_none());
        assert!(report.estimated_full_mah.is_none());
    }

    #[test]
    fn test_manual_debounce_trims_stale_tail() {
        let mut acc = SessionAccumulator::new(ChargeMode::Manual);

        for i in 0..7 {
            assert!(acc.ingest(reading(i * 5, false, 3.7, -0.5), false).is_none());
        }
        // The user pressed 'c' late: the final reading already shows the
        // charger-fed voltage and was flagged out of range.
        let mut stale = reading(35, false, 3.85, -0.5);
        stale.out_of_range = true;
        let flush = acc.ingest(stale, true).expect("shutdown flush");

        assert_eq!(flush.readings.len(), 7);
        assert!(flush
            .readings
            .iter()
            .all(|r| (r.voltage - 3.7).abs() < 1e-9));
        assert_eq!(flush.report.out_of_range_percent, 0.0);
        assert_eq!(flush.report.end_timestamp, 30);
    }

    #[test]
    fn test_manual_debounce_trims_at_most_two() {
        let mut acc = SessionAccumulator::new(ChargeMode::Manual);

        for i in 0..6 {
            assert!(acc.ingest(reading(i * 5, false, 3.7, -0.5), false).is_none());
        }
        assert!(acc.ingest(reading(30, false, 3.85, -0.5), false).is_none());
        let flush = acc
            .ingest(reading(35, false, 3.87, -0.5), true)
            .expect("shutdown flush");

        assert_eq!(flush.readings.len(), 6);
        assert_eq!(flush.report.end_timestamp, 25);
    }

    #[test]
    fn test_automatic_mode_keeps_divergent_tail() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        for i in 0..7 {
            assert!(acc.ingest(discharge_at(i * 5), false).is_none());
        }
        let flush = acc
            .ingest(reading(35, false, 3.85, -1.0), true)
            .expect("shutdown flush");
        assert_eq!(flush.readings.len(), 8);
    }

    #[test]
    fn test_charging_session_reports_net_energy() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        // 4.2 V * 1.0 A = 4.2 W charging, 0.1 V resistive drop.
        let mut flushed = None;
        for i in 0..=720i64 {
            let mut r = reading(i * 5, true, 4.2, 1.0);
            r.effective_voltage = 4.1;
            if let Some(flush) = acc.ingest(r, i == 720) {
                flushed = Some(flush);
            }
        }
        let report = flushed.expect("shutdown flush").report;

        assert!(report.charging);
        assert!((report.energy_wh - 4.2).abs() < 1e-6);
        assert!((report.resistive_loss_wh - 0.1).abs() < 1e-6);
        assert!((report.net_energy_wh - 4.1).abs() < 1e-6);
        // 1 - 0.1/4.2 rounds to 98%
        assert_eq!(report.efficiency_percent, Some(98));
    }

    #[test]
    fn test_out_of_range_percentage() {
        let mut acc = SessionAccumulator::new(ChargeMode::Automatic);

        let mut flushed = None;
        for i in 0..10i64 {
            let mut r = discharge_at(i * 5);
            r.out_of_range = i < 2;
            if let Some(flush) = acc.ingest(r, i == 9) {
                flushed = Some(flush);
            }
        }
        let report = flushed.expect("shutdown flush").report;
        assert!((report.out_of_range_percent - 20.0).abs() < 1e-9);
    }
}
