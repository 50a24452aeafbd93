//! Battery power-source access for voltwatch.
//!
//! This crate provides the raw battery reading model and the sysfs-backed
//! power source used by the monitor loop.
//!
//! # Example
//!
//! ```ignore
//! use voltwatch_platform::{ChargeMode, PowerSource, SysfsPowerSource};
//!
//! let mut source = SysfsPowerSource::new(ChargeMode::Automatic, 0.1)?;
//! let reading = source.read();
//! println!("{}", reading.render_line(true));
//! ```

mod reading;
mod source;
mod sysfs;

pub use reading::{format_float, format_timestamp, format_timestamp_filename, ChargeMode, Reading};
pub use source::{BatteryLimits, BatteryTechnology, PowerSource};
pub use sysfs::SysfsPowerSource;
