//! Interactive configuration, including the internal-resistance
//! measurement. Runs on first start and via the `configure` subcommand.

use std::io::{self, Write};

use color_eyre::eyre::{Result, WrapErr};
use voltwatch_platform::{
    format_float, BatteryTechnology, ChargeMode, PowerSource, SysfsPowerSource,
};

use crate::config::{config_path, AlarmConfig};

pub fn run() -> Result<()> {
    run_interactive().map(|_| ())
}

/// Walk the user through the mode question, the resistance measurement and
/// the thresholds, then persist the config.
pub fn run_interactive() -> Result<AlarmConfig> {
    // Probe with a neutral reader; a missing device means the program
    // cannot work on this machine at all.
    let mut probe = SysfsPowerSource::new(ChargeMode::Automatic, 0.0)
        .wrap_err("failed to find the power gauge device; this computer may not be supported")?;

    println!("voltwatch {}", env!("CARGO_PKG_VERSION"));
    println!(
        "This program checks the battery voltage and makes an alarm sound while it is out of the configured range.\n\
         Requirement: driver support for your model of fuel gauge (PMIC) in your Linux distribution.\n"
    );
    println!("Starting configuration.\n");

    let mut config = AlarmConfig::default();

    config.manual_switch = prompt_yes(
        "Has your charge circuit been modified in a way that keeps the power gauge \
         from seeing the charging status? (y/N) ",
    )?;
    if config.manual_switch {
        println!(
            "Notice: the gauge may report wrong percentages, because charging current \
             does not flow through it."
        );
    }

    let limits = probe.limits();
    if limits.technology != BatteryTechnology::Unknown {
        println!("Battery technology: {}", limits.technology);
    }
    if !limits.technology.is_lithium() {
        println!(
            "The default thresholds are calibrated for lithium cells and may be \
             improper for your kind of battery."
        );
    }
    if limits.max_voltage_design > 0.0 {
        println!(
            "Designed max voltage: {} V",
            format_float(limits.max_voltage_design, 3, false)
        );
    }
    println!();

    measure_internal_resistance(&mut probe, &mut config)?;
    println!();

    let min_voltage = prompt_f64("Min voltage (V, alarm while lower than this): ")?;
    let max_voltage = prompt_f64("Max voltage (V, not good for the battery if higher): ")?;
    if config.manual_switch {
        println!("The power of the computer circuit is accounted as negative.");
    } else {
        println!("Battery power can be calculated; it is negative while discharging.");
    }
    let max_power = prompt_f64("Max power (W, absolute): ")?;

    match (min_voltage, max_voltage, max_power) {
        (Some(min), Some(max), Some(power)) => {
            config.min_voltage = min;
            config.max_voltage = max;
            config.max_power = power;
        }
        _ => println!(
            "At least one of them was not numeric. Default values will be used: \
             {}~{} V, {} W.",
            format_float(config.min_voltage, 2, false),
            format_float(config.max_voltage, 2, false),
            format_float(config.max_power, 2, false),
        ),
    }

    config.save().wrap_err("failed to save config")?;
    println!("Config saved to {}.\n", config_path().display());

    Ok(config)
}

/// DC method: sample the terminal voltage at two different loads and solve
/// `U1 = E - I1*r`, `U2 = E - I2*r` (discharge reference direction).
/// Not very accurate, but needs no extra hardware.
fn measure_internal_resistance(
    probe: &mut SysfsPowerSource,
    config: &mut AlarmConfig,
) -> Result<()> {
    println!("We'll measure the internal resistance of the battery.");
    if config.manual_switch {
        prompt_line("Please make sure the battery is discharging, then press Enter to continue...")?;
    }

    let first = probe.read();
    let (u1, i1) = (first.voltage, -first.current);
    println!(
        "Sample 1: {} V, {} A.",
        format_float(u1, 3, false),
        format_float(i1, 3, false)
    );

    prompt_line(&format!(
        "Please do something to make the current change{}, then press Enter to continue...",
        if config.manual_switch {
            " (but keep it discharging)"
        } else {
            ""
        }
    ))?;

    let second = probe.read();
    let (u2, i2) = (second.voltage, -second.current);
    println!(
        "Sample 2: {} V, {} A.",
        format_float(u2, 3, false),
        format_float(i2, 3, false)
    );

    if (i1 - i2).abs() < 0.001 {
        println!(
            "Sorry, the current has not changed; r stays at the default: {} Ω.",
            format_float(config.internal_resistance, 3, false)
        );
        return Ok(());
    }

    let r = (u2 - u1) / (i1 - i2);
    if prompt_yes(&format!(
        "r: {} Ω. Do you think it's the right value? (y/n) ",
        format_float(r, 3, false)
    ))? {
        config.internal_resistance = r;
    } else {
        println!(
            "r stays at the default: {} Ω.",
            format_float(config.internal_resistance, 3, false)
        );
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_yes(prompt: &str) -> Result<bool> {
    Ok(prompt_line(prompt)?.to_lowercase().starts_with('y'))
}

fn prompt_f64(prompt: &str) -> Result<Option<f64>> {
    Ok(prompt_line(prompt)?.parse::<f64>().ok())
}
