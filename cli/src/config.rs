use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use voltwatch_platform::format_float;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "off" => LogLevel::Off,
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    pub fn as_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Trace => Some(tracing::Level::TRACE),
        }
    }
}

/// Alarm thresholds and battery parameters, persisted as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// True when the power gauge cannot report the charge direction and the
    /// measured current is the computer-circuit draw, not cell current.
    pub manual_switch: bool,

    /// Battery internal resistance in ohms.
    pub internal_resistance: f64,

    /// Alarm when the terminal voltage drops below this, volts.
    pub min_voltage: f64,

    /// Alarm when the effective voltage rises above this, volts.
    pub max_voltage: f64,

    /// Alarm when the absolute power exceeds this, watts.
    pub max_power: f64,

    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        // Defaults suit a single Li-ion cell.
        Self {
            manual_switch: false,
            internal_resistance: 0.1,
            min_voltage: 3.8,
            max_voltage: 4.15,
            max_power: 5.0,
            log_level: LogLevel::default(),
        }
    }
}

impl AlarmConfig {
    /// Load the persisted config, `None` when missing or damaged so the
    /// caller can run the interactive setup.
    pub fn load() -> Option<Self> {
        let path = config_path();
        if !path.exists() {
            return None;
        }
        let content = fs::read_to_string(&path).ok()?;
        toml::from_str(&content).ok()
    }

    pub fn save(&self) -> std::io::Result<()> {
        let _ = ensure_dirs();
        let path = config_path();
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, content)
    }

    /// Human-readable summary for the terminal.
    pub fn render(&self) -> String {
        format!(
            "Manual switch: {}\n\
             Internal resistance: {} Ω\n\
             Min voltage: {} V\n\
             Max voltage: {} V\n\
             Max power: {} W\n",
            if self.manual_switch {
                "Enabled"
            } else {
                "Disabled"
            },
            format_float(self.internal_resistance, 3, false),
            format_float(self.min_voltage, 3, false),
            format_float(self.max_voltage, 3, false),
            format_float(self.max_power, 3, false),
        )
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("voltwatch")
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("voltwatch")
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("voltwatch")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

pub fn ensure_dirs() -> std::io::Result<()> {
    fs::create_dir_all(config_dir())?;
    fs::create_dir_all(data_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_li_ion_cell() {
        let config = AlarmConfig::default();
        assert!(!config.manual_switch);
        assert!((config.internal_resistance - 0.1).abs() < 1e-9);
        assert!((config.min_voltage - 3.8).abs() < 1e-9);
        assert!((config.max_voltage - 4.15).abs() < 1e-9);
        assert!((config.max_power - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AlarmConfig::default();
        config.manual_switch = true;
        config.internal_resistance = 0.085;
        config.max_power = 12.5;
        config.log_level = LogLevel::Debug;

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AlarmConfig = toml::from_str(&text).unwrap();

        assert!(parsed.manual_switch);
        assert!((parsed.internal_resistance - 0.085).abs() < 1e-9);
        assert!((parsed.max_power - 12.5).abs() < 1e-9);
        assert_eq!(parsed.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let parsed: AlarmConfig = toml::from_str("min_voltage = 3.5\n").unwrap();
        assert!((parsed.min_voltage - 3.5).abs() < 1e-9);
        assert!((parsed.max_voltage - 4.15).abs() < 1e-9);
        assert_eq!(parsed.log_level, LogLevel::Info);
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("TRACE"), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("off"), LogLevel::Off);
        assert_eq!(LogLevel::from_str("bogus"), LogLevel::Info);
        assert!(LogLevel::Off.as_tracing_level().is_none());
    }
}
