//! Logging configuration
//!
//! Uses log4rs with appenders:
//! 1. ConsoleAppender - stdout output
//! 2. RollingFileAppender - log files with rotation (desktop only)
//! 3. ForwardAppender - hands location session logs to the host (optional)

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
#[cfg(not(target_os = "android"))]
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
#[cfg(not(target_os = "android"))]
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
#[cfg(not(target_os = "android"))]
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
#[cfg(not(target_os = "android"))]
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::PluginConfig;

/// Log target prefix of this crate
const FORWARDED_TARGET: &str = "location_bridge";

// ============================================================================
// Forward Appender
// ============================================================================

/// Log record handed to the host
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub level: String,
    pub message: String,
}

type Forward = Box<dyn Fn(LogEvent) + Send + Sync>;

/// Custom log4rs appender that forwards this crate's info/warn/error logs
pub struct ForwardAppender {
    forward: Forward,
}

impl ForwardAppender {
    pub fn new<F>(forward: F) -> Self
    where
        F: Fn(LogEvent) + Send + Sync + 'static,
    {
        Self {
            forward: Box::new(forward),
        }
    }
}

impl fmt::Debug for ForwardAppender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardAppender").finish_non_exhaustive()
    }
}

impl log4rs::append::Append for ForwardAppender {
    fn append(&self, record: &log::Record) -> anyhow::Result<()> {
        if !record.target().starts_with(FORWARDED_TARGET) {
            return Ok(());
        }

        // Only forward info, warn, error (skip debug/trace)
        let level = match record.level() {
            log::Level::Error => "error",
            log::Level::Warn => "warn",
            log::Level::Info => "info",
            _ => return Ok(()),
        };

        (self.forward)(LogEvent {
            level: level.to_string(),
            message: format!("{}", record.args()),
        });

        Ok(())
    }

    fn flush(&self) {}
}

// ============================================================================
// Logger Initialization
// ============================================================================

/// Initialize log4rs with a console appender and, if given, a forward appender.
/// On desktop, also adds a rolling file appender.
///
/// # Arguments
/// * `log_dir` - Directory for log files (ignored on Android)
/// * `config` - Plugin config; its `logLevel` sets the root level, unknown names fall back to info
/// * `forward` - Optional appender handing records to the host
///
/// # Log File Configuration (desktop only)
/// - File: `{log_dir}/location.1.log`
/// - Max size: 10 MB per file
/// - Max count: 5 files (rotation)
pub fn init_logger(
    log_dir: PathBuf,
    config: &PluginConfig,
    forward: Option<ForwardAppender>,
) -> Result<log4rs::Handle, Box<dyn std::error::Error>> {
    let config = build_config(log_dir, &config.log_level, forward)?;
    Ok(log4rs::init_config(config)?)
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level).unwrap_or(LevelFilter::Info)
}

fn build_config(
    log_dir: PathBuf,
    level: &str,
    forward: Option<ForwardAppender>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build();

    let mut builder =
        Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    // On Android, skip file appender (permission issues)
    #[cfg(target_os = "android")]
    {
        let _ = log_dir;
    }

    #[cfg(not(target_os = "android"))]
    {
        std::fs::create_dir_all(&log_dir)?;

        let log_file = log_dir.join("location.1.log");
        let log_pattern = log_dir.join("location.{}.log");
        let log_pattern = log_pattern
            .to_str()
            .ok_or("Log directory is not valid UTF-8")?;

        let roller = FixedWindowRoller::builder().base(1).build(log_pattern, 5)?;
        let trigger = SizeTrigger::new(10 * 1024 * 1024); // 10 MB
        let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

        let logfile = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(
                "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
            )))
            .build(log_file, Box::new(policy))?;

        builder = builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    if let Some(forward) = forward {
        builder = builder.appender(Appender::builder().build("forward", Box::new(forward)));
        root = root.appender("forward");
    }

    Ok(builder.build(root.build(parse_level(level)))?)
}
