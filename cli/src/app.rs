//! The polling monitor loop.

use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tracing::{debug, info, trace, warn};
use voltwatch_platform::{ChargeMode, PowerSource, SysfsPowerSource};

use crate::config::AlarmConfig;
use crate::data::alarm;
use crate::data::{SessionAccumulator, SessionLogger, POLL_INTERVAL_SECS};
use crate::input::ControlFlags;

/// Poll the power source on a fixed cadence until an exit is requested.
///
/// Each iteration acquires one reading, evaluates the alarm thresholds,
/// echoes the reading, and feeds it into the session accumulator; a flush
/// prints the session report and optionally persists it.
pub fn run_monitor(config: &AlarmConfig, flags: Arc<ControlFlags>) -> Result<()> {
    let mode = ChargeMode::from_manual_switch(config.manual_switch);
    let mut source = SysfsPowerSource::new(mode, config.internal_resistance)
        .wrap_err("failed to read power status; this computer may not be supported")?;

    let limits = source.limits();
    info!(
        device = %source.device_path().display(),
        technology = %limits.technology,
        max_voltage_design = limits.max_voltage_design,
        "power source ready"
    );

    let logger = SessionLogger::new();
    let mut accumulator = SessionAccumulator::new(mode);

    loop {
        if mode.is_manual() {
            source.set_charging(flags.charging_override());
        }
        let mut reading = source.read();

        let decision = alarm::evaluate(&reading, config, &limits);
        reading.out_of_range = decision.out_of_range;
        if decision.should_sound {
            print!("\x07"); // terminal bell
            let _ = std::io::stdout().flush();
        }

        println!("{}", reading.render_line(true));

        let shutdown = flags.exit_requested();
        match accumulator.ingest(reading, shutdown) {
            Some(flush) => {
                debug!(cause = ?flush.cause, samples = flush.readings.len(), "session flushed");
                println!("\n{}", flush.report.render());

                if flags.save_logs_enabled() {
                    match logger.save(&flush) {
                        Ok(path) => println!("log file {} saved.\n", path.display()),
                        Err(e) => {
                            warn!("failed to save session log: {e}");
                            eprintln!("failed to save session log: {e}");
                        }
                    }
                }
            }
            None => trace!(buffered = accumulator.len(), "reading accumulated"),
        }

        if shutdown {
            info!("exit requested, monitor stopping");
            return Ok(());
        }

        thread::sleep(Duration::from_secs(POLL_INTERVAL_SECS as u64));
    }
}
