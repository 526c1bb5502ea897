use crate::config::Settings;
use colored::Colorize;
use log::{Level, LevelFilter, Record};
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Stdout,
    File(PathBuf),
}

impl LogTarget {
    /// `stdout`/`-` and `stderr`/empty are streams; anything else is a file path.
    pub fn from_setting(logfile: Option<&str>) -> Self {
        match logfile.map(str::trim) {
            None | Some("") | Some("stderr") => LogTarget::Stderr,
            Some("stdout") | Some("-") => LogTarget::Stdout,
            Some(path) => LogTarget::File(PathBuf::from(path)),
        }
    }
}

/// Writes the `shutdown` line to a log file when dropped.
pub struct LogGuard {
    to_file: bool,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if self.to_file {
            log::info!("shutdown");
            log::logger().flush();
        }
    }
}

pub fn init_logging(settings: &Settings) -> Result<LogGuard, Box<dyn Error>> {
    let debug = settings.debug;
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let target = LogTarget::from_setting(settings.logfile.as_deref());
    let dispatch = fern::Dispatch::new().level(level);

    let to_file = matches!(target, LogTarget::File(_));
    let dispatch = match target {
        LogTarget::Stderr => dispatch
            .format(move |out, message, record| {
                out.finish(format_args!("{}{}", console_prefix(record, debug), message))
            })
            .chain(std::io::stderr()),
        LogTarget::Stdout => dispatch
            .format(move |out, message, record| {
                out.finish(format_args!("{}{}", console_prefix(record, debug), message))
            })
            .chain(std::io::stdout()),
        LogTarget::File(path) => {
            let file = fern::log_file(&path)
                .map_err(|e| format!("failed opening log file {}: {}", path.display(), e))?;
            let pid = std::process::id();
            dispatch
                .format(move |out, message, record| {
                    out.finish(format_args!(
                        "{} [{}] {}{}",
                        chrono::Local::now().format("%Y/%m/%d %H:%M:%S"),
                        pid,
                        source_location(record, debug),
                        message
                    ))
                })
                .chain(file)
        }
    };
    dispatch.apply()?;

    if to_file {
        log::info!(
            "{} v{} startup",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
    }
    Ok(LogGuard { to_file })
}

fn console_prefix(record: &Record, debug: bool) -> String {
    let location = source_location(record, debug);
    match record.level() {
        Level::Error => format!("{} {}", "error:".red().bold(), location),
        Level::Warn => format!("{} {}", "warning:".yellow().bold(), location),
        Level::Info => location,
        Level::Debug | Level::Trace => format!("{} {}", "debug:".dimmed(), location),
    }
}

fn source_location(record: &Record, debug: bool) -> String {
    if !debug {
        return String::new();
    }
    match (record.file(), record.line()) {
        (Some(file), Some(line)) => format!("{}:{}: ", file, line),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_target_recognizes_streams() {
        assert_eq!(LogTarget::from_setting(None), LogTarget::Stderr);
        assert_eq!(LogTarget::from_setting(Some("")), LogTarget::Stderr);
        assert_eq!(LogTarget::from_setting(Some("stderr")), LogTarget::Stderr);
        assert_eq!(LogTarget::from_setting(Some("stdout")), LogTarget::Stdout);
        assert_eq!(LogTarget::from_setting(Some("-")), LogTarget::Stdout);
    }

    #[test]
    fn log_target_treats_other_values_as_paths() {
        assert_eq!(
            LogTarget::from_setting(Some("/var/log/goon.log")),
            LogTarget::File(PathBuf::from("/var/log/goon.log"))
        );
    }

    fn with_record<F: FnOnce(&Record)>(f: F) {
        f(&Record::builder()
            .level(Level::Info)
            .file(Some("src/main.rs"))
            .line(Some(42))
            .args(format_args!("hello"))
            .build());
    }

    #[test]
    fn source_location_only_in_debug() {
        with_record(|record| {
            assert_eq!(source_location(record, true), "src/main.rs:42: ");
            assert_eq!(source_location(record, false), "");
        });
    }

    #[test]
    fn info_lines_have_no_level_prefix() {
        with_record(|record| assert_eq!(console_prefix(record, false), ""));
    }
}
