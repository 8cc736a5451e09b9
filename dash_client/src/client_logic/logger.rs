use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Log files written by this client start with this prefix.
const LOG_FILE_PREFIX: &str = "dash_client_";

pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<PathBuf> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    // Clean up old log files, keeping only the most recent one
    cleanup_old_logs(log_dir)?;

    let log_file_name = format!(
        "{}{}.log",
        LOG_FILE_PREFIX,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = log_dir.join(log_file_name);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(parse_level(log_level))
        .chain(std::io::stdout())
        .chain(fern::log_file(&log_path)?)
        .apply()?;

    Ok(log_path)
}

fn parse_level(log_level: &str) -> log::LevelFilter {
    match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

fn cleanup_old_logs(log_dir: &Path) -> Result<()> {
    let mut log_files: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "log")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        })
        .collect();

    // Names carry a sortable timestamp: newest first.
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    // Keep the most recent one (index 0), delete the rest
    for old_file in log_files.iter().skip(1) {
        if let Err(e) = fs::remove_file(old_file) {
            eprintln!("Failed to delete old log file {:?}: {}", old_file, e);
        }
    }

    Ok(())
}
