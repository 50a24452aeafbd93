//! JSON sample stream, suitable for piping into other tools.

use std::thread;
use std::time::Duration;

use color_eyre::eyre::Result;
use voltwatch_platform::{ChargeMode, PowerSource, SysfsPowerSource};

use crate::config::AlarmConfig;
use crate::data::alarm;

pub fn run(samples: u32, interval_ms: u64, compact: bool) -> Result<()> {
    let config = AlarmConfig::load().unwrap_or_default();
    let mode = ChargeMode::from_manual_switch(config.manual_switch);
    let mut source = SysfsPowerSource::new(mode, config.internal_resistance)?;
    let limits = source.limits();
    let mut counter = 0u32;

    loop {
        let mut reading = source.read();
        reading.out_of_range = alarm::evaluate(&reading, &config, &limits).out_of_range;

        let mut doc = serde_json::to_value(&reading)?;
        doc["status"] = serde_json::json!(reading.status_word());
        doc["power_w"] = serde_json::json!(reading.power());

        if compact {
            println!("{}", serde_json::to_string(&doc)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }

        counter += 1;
        if samples > 0 && counter >= samples {
            break;
        }

        thread::sleep(Duration::from_millis(interval_ms));
    }

    Ok(())
}
