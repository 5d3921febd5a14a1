use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

/// Target for write audit records (create/replace/delete).
pub const AUDIT_TARGET: &str = "snakebite::audit";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const KEEP_FILES: u32 = 7;

#[must_use]
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(dir: &Path, stem: &str) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", dir.join(format!("{stem}.{{}}.log")).display()), KEEP_FILES)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(dir.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Builds the logging config: console always; with `dir`, also a rolling
/// `snakebite.log` and a separate rolling `audit.log` for [`AUDIT_TARGET`].
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created.
pub fn build_config(level: &str, dir: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let lvl = parse_level(level);
    let console = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(PATTERN))).build();
    let mut builder = Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)?;
        builder = builder
            .appender(Appender::builder().build("app", Box::new(rolling(dir, "snakebite")?)))
            .appender(Appender::builder().build("audit", Box::new(rolling(dir, "audit")?)))
            .logger(
                Logger::builder()
                    .appender("audit")
                    .appender("console")
                    .additive(false)
                    .build(AUDIT_TARGET, LevelFilter::Info),
            );
        root = root.appender("app");
    }

    Ok(builder.build(root.build(lvl))?)
}

/// Initializes the logging system. Call once at start-up.
///
/// # Errors
/// Returns an error if the config cannot be built or a logger is already set.
pub fn init(level: &str, dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_config(build_config(level, dir)?)?;
    Ok(())
}
