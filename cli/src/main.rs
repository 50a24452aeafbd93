mod app;
mod commands;
mod config;
mod data;
mod input;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

use config::{config_path, ensure_dirs, AlarmConfig, LogLevel};
use logging::LogMode;

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the alarm and session-accounting loop (default)
    Monitor,

    /// Interactive setup: mode, internal-resistance measurement, thresholds
    Configure,

    /// Show or edit configuration
    Config {
        /// Print config file path
        #[arg(long)]
        path: bool,

        /// Reset config to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(short, long)]
        edit: bool,
    },

    /// Print debug information about the power source
    Debug,

    /// Output readings in JSON format (suitable for piping)
    #[command(alias = "raw")]
    Pipe {
        /// Number of samples to output (0 = infinite)
        #[arg(short, long, default_value_t = 0)]
        samples: u32,

        /// Update interval in milliseconds
        #[arg(short, long, default_value_t = 5000)]
        interval: u64,

        /// Compact JSON output (one line per sample)
        #[arg(short, long)]
        compact: bool,
    },
}

/// Battery voltage alarm and per-session energy accounting
/// https://github.com/wuwbobo/voltwatch
#[derive(Debug, Parser)]
#[command(name = "voltwatch", version, verbatim_doc_comment)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable session-log saving from the start
    #[arg(short = 'l', long, global = true)]
    save_logs: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = ensure_dirs();

    let cli = Cli::parse();
    let log_level_override = cli.log_level.as_deref().map(LogLevel::from_str);

    match cli.command {
        Some(Commands::Configure) => {
            let _guard = init_stderr_logging(log_level_override);
            commands::configure::run()
        }
        Some(Commands::Config { path, reset, edit }) => {
            let _guard = init_stderr_logging(log_level_override);
            run_config(path, reset, edit)
        }
        Some(Commands::Debug) => {
            let _guard = init_stderr_logging(log_level_override);
            commands::debug::run()
        }
        Some(Commands::Pipe {
            samples,
            interval,
            compact,
        }) => {
            let _guard = init_stderr_logging(log_level_override);
            commands::pipe::run(samples, interval, compact)
        }
        Some(Commands::Monitor) | None => run_monitor(cli.save_logs, log_level_override),
    }
}

fn init_stderr_logging(log_level_override: Option<LogLevel>) -> logging::LogGuard {
    let level = AlarmConfig::load().unwrap_or_default().log_level;
    logging::init(level, LogMode::Stderr, log_level_override)
}

fn run_monitor(save_logs: bool, log_level_override: Option<LogLevel>) -> Result<()> {
    let config = match AlarmConfig::load() {
        Some(config) => {
            println!("{} found:\n{}", config_path().display(), config.render());
            println!(
                "You can reconfigure (and remeasure the internal resistance) with \
                 `voltwatch configure`.\n"
            );
            config
        }
        None => commands::configure::run_interactive()?,
    };

    // File logging keeps the terminal clean for the reading echo.
    let _guard = logging::init(config.log_level, LogMode::File, log_level_override);

    let flags = input::ControlFlags::new(save_logs);
    input::spawn_input_thread(flags.clone(), config.manual_switch);

    app::run_monitor(&config, flags)
}

fn run_config(path: bool, reset: bool, edit: bool) -> Result<()> {
    let config_file = config_path();

    if path {
        println!("{}", config_file.display());
        return Ok(());
    }

    if reset {
        let config = AlarmConfig::default();
        config.save()?;
        println!("Config reset to defaults at: {}", config_file.display());
        return Ok(());
    }

    if edit {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

        if !config_file.exists() {
            AlarmConfig::default().save()?;
        }

        std::process::Command::new(editor)
            .arg(&config_file)
            .status()?;

        return Ok(());
    }

    let config = AlarmConfig::load().unwrap_or_default();
    println!("Config file: {}", config_file.display());
    println!();
    println!("{}", config.render());

    Ok(())
}
