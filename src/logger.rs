use crate::config::ServiceConfig;
use crate::metrics::METRICS_TARGET;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

/// Initializes logging from a log4rs YAML file.
///
/// # Errors
/// Returns an error if the file cannot be loaded.
pub fn init_from_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Builds the logging config: `{dir}/shipment-query.log` for the application,
/// `{dir}/metrics.log` for metric snapshots, and warnings mirrored to stderr.
/// Both files roll at 10 MiB keeping `retention` old files.
///
/// # Errors
/// Returns an error if the directory cannot be created or an appender fails to build.
pub fn build_config(
    dir: &Path,
    level: LevelFilter,
    retention: usize,
) -> Result<Config, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let keep = u32::try_from(retention).unwrap_or(u32::MAX);
    let app = rolling_appender(dir, "shipment-query", keep)?;
    let metrics = rolling_appender(dir, "metrics", keep)?;
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(app)))
        .appender(Appender::builder().build("metrics", Box::new(metrics)))
        .appender(
            Appender::builder()
                .filter(Box::new(log4rs::filter::threshold::ThresholdFilter::new(LevelFilter::Warn)))
                .build("stderr", Box::new(stderr)),
        )
        .logger(Logger::builder().appender("metrics").additive(false).build(METRICS_TARGET, level))
        .build(Root::builder().appender("app").appender("stderr").build(level))?;
    Ok(config)
}

fn rolling_appender(
    dir: &Path,
    stem: &str,
    keep: u32,
) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", dir.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(dir.join(format!("{stem}.log")), Box::new(policy))?;
    Ok(appender)
}

/// Configures process-wide logging from the service config. Logs go to
/// `log_dir`, or the current directory when unset.
///
/// # Errors
/// Returns an error if the config cannot be built or a logger is already installed.
pub fn configure(cfg: &ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(file) = &cfg.log_config {
        return init_from_file(file);
    }
    let dir = cfg
        .log_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let config = build_config(&dir, parse_level(cfg.log_level.as_deref()), cfg.log_retention)?;
    log4rs::init_config(config)?;
    Ok(())
}
