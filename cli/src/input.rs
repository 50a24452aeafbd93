//! Shared control flags and the stdin command thread.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::debug;

/// Flags shared between the input thread and the monitor loop.
///
/// Each flag has a single writer (the input thread) and a single reader (the
/// monitor loop), so relaxed ordering is enough; a toggle may be observed up
/// to one poll cycle late.
#[derive(Debug, Default)]
pub struct ControlFlags {
    exit: AtomicBool,
    charging: AtomicBool,
    save_logs: AtomicBool,
}

impl ControlFlags {
    pub fn new(save_logs: bool) -> Arc<Self> {
        Arc::new(Self {
            save_logs: AtomicBool::new(save_logs),
            ..Self::default()
        })
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Relaxed);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Relaxed)
    }

    pub fn set_charging(&self, charging: bool) {
        self.charging.store(charging, Ordering::Relaxed);
    }

    pub fn charging_override(&self) -> bool {
        self.charging.load(Ordering::Relaxed)
    }

    /// Flip log saving and return the new state.
    pub fn toggle_save_logs(&self) -> bool {
        !self.save_logs.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn save_logs_enabled(&self) -> bool {
        self.save_logs.load(Ordering::Relaxed)
    }
}

/// Print the command help and spawn the detached line-reader thread.
pub fn spawn_input_thread(flags: Arc<ControlFlags>, manual_switch: bool) {
    print!(
        "press Ctrl+D or input 'e' to end the program, \
         input 'l' to enable/disable log saving"
    );
    if manual_switch {
        println!(
            ", input 'c' (charging) or 'd' (discharging) to switch the charging status.\n\
             Notice: alarm decisions follow your manual status setting, so keep it current.\n"
        );
    } else {
        println!(".\n");
    }

    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
                Some('e') => {
                    flags.request_exit();
                    debug!("exit requested from input");
                }
                Some('c') if manual_switch => flags.set_charging(true),
                Some('d') if manual_switch => flags.set_charging(false),
                Some('l') => {
                    let enabled = flags.toggle_save_logs();
                    println!(
                        "Log saving {}.",
                        if enabled { "enabled" } else { "disabled" }
                    );
                }
                _ => {}
            }
        }

        // stdin closed (Ctrl+D)
        flags.request_exit();
    });
}
