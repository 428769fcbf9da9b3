use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "distribution.log";
pub const LEVEL_ENV: &str = "CALLROSTER_LOG_LEVEL";

pub struct LogOptions {
    pub debug: bool,
    /// Directory for `distribution.log`; `None` logs to stdout only.
    pub dir: Option<PathBuf>,
    /// Level from the settings document, used when the environment names none.
    pub level: Option<String>,
}

/// Keeps the log file handle alive for the life of the process.
pub struct LogGuard {
    file: Option<Arc<Mutex<File>>>,
}

impl LogGuard {
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

struct MultiWriter {
    stdout: io::Stdout,
    file: Option<Arc<Mutex<File>>>,
}

impl MultiWriter {
    fn new(file: Option<Arc<Mutex<File>>>) -> Self {
        Self {
            stdout: io::stdout(),
            file,
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = self.stdout.write_all(buf);
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(buf);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.stdout.flush();
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
        Ok(())
    }
}

/// `--debug` wins, then the level env var, then the settings document.
pub fn resolve_level(debug: bool, env_level: Option<String>, configured: Option<&str>) -> String {
    if debug {
        return "debug".to_string();
    }
    env_level
        .filter(|level| !level.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| "info".to_string())
}

pub fn init_logging(options: &LogOptions) -> Option<LogGuard> {
    let level = resolve_level(
        options.debug,
        std::env::var(LEVEL_ENV).ok(),
        options.level.as_deref(),
    );
    let filter = if options.debug {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let guard = match options.dir.as_deref() {
        Some(dir) => open_log_file(dir).unwrap_or_else(|err| {
            eprintln!("log_file_error: {err}");
            LogGuard { file: None }
        }),
        None => LogGuard { file: None },
    };
    let file = guard.file.clone();
    let make_writer = BoxMakeWriter::new(move || MultiWriter::new(file.clone()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_ansi(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return None;
    }
    Some(guard)
}

fn open_log_file(dir: &Path) -> io::Result<LogGuard> {
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;
    Ok(LogGuard {
        file: Some(Arc::new(Mutex::new(file))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_precedence() {
        assert_eq!(resolve_level(true, Some("warn".to_string()), Some("error")), "debug");
        assert_eq!(resolve_level(false, Some("warn".to_string()), Some("error")), "warn");
        assert_eq!(resolve_level(false, Some("  ".to_string()), Some("error")), "error");
        assert_eq!(resolve_level(false, None, None), "info");
    }

    #[test]
    fn log_file_is_appended_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("logs");

        let guard = open_log_file(&nested).expect("open log");
        assert!(guard.has_file());
        let mut writer = MultiWriter::new(guard.file.clone());
        writer.write_all(b"first line\n").expect("write");
        writer.flush().expect("flush");
        drop(writer);

        let again = open_log_file(&nested).expect("reopen");
        let mut writer = MultiWriter::new(again.file.clone());
        writer.write_all(b"second line\n").expect("write");
        writer.flush().expect("flush");

        let content = std::fs::read_to_string(nested.join(LOG_FILE_NAME)).expect("read log");
        assert_eq!(content, "first line\nsecond line\n");
    }
}
