//! Diagnostics printout for bug reports.

use color_eyre::eyre::Result;
use voltwatch_platform::{format_float, ChargeMode, PowerSource, SysfsPowerSource};

use crate::config::{config_path, logs_dir, AlarmConfig};

pub fn run() -> Result<()> {
    let config = AlarmConfig::load().unwrap_or_default();
    let mode = ChargeMode::from_manual_switch(config.manual_switch);

    println!("voltwatch debug information");
    println!("{}", "=".repeat(60));

    println!("\n--- Power Source ---");
    println!("Battery present: {}", SysfsPowerSource::is_available());
    match SysfsPowerSource::new(mode, config.internal_resistance) {
        Ok(mut source) => {
            println!("Device: {}", source.device_path().display());
            let limits = source.limits();
            println!("Technology: {}", limits.technology);
            if limits.max_voltage_design > 0.0 {
                println!(
                    "Designed max voltage: {} V",
                    format_float(limits.max_voltage_design, 3, false)
                );
            }
            println!("Reading: {}", source.read().render_line(true));
        }
        Err(e) => println!("unavailable: {e}"),
    }

    println!("\n--- Paths ---");
    println!("Config: {}", config_path().display());
    println!("Session logs: {}", logs_dir().display());

    println!("\n--- Current Config ---");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
