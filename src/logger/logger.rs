use serde::Serialize;

use crate::config::settings::{Logger, Settings};

#[derive(Serialize)]
pub struct LoggerExtraFields {
    pub request_id: String,
}

pub fn setup_logger(settings: &Settings) {
    let setting_level = &settings
        .logger
        .clone()
        .unwrap_or(Logger {
            level: "info".to_string(),
        })
        .level;

    let log_level = match setting_level.as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::builder()
        .filter_level(log_level)
        .format_timestamp_micros()
        .format(ecs_logger::format)
        .target(env_logger::Target::Stdout)
        .init();
}
