use parking_lot::Mutex;
/// Diagnostic log output for term-autolog
///
/// All `log` records go to `term_autolog_debug.log` in the system temp
/// directory (`/tmp` on most Unix systems). The process is usually running
/// next to the very terminals it logs, so nothing is written to them.
///
/// When `RUST_LOG` is set, records are also mirrored to stderr.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// File the bridge writes to.
pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join("term_autolog_debug.log")
}

struct DebugLogger {
    file: Option<std::fs::File>,
    mirror_stderr: bool,
}

impl DebugLogger {
    fn new(level: log::LevelFilter, mirror_stderr: bool) -> Self {
        let file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path())
        {
            Ok(f) => Some(f),
            // Nowhere to log to; stay quiet rather than touch the terminal
            Err(_) => None,
        };
        let mut logger = DebugLogger {
            file,
            mirror_stderr,
        };
        logger.write_raw(&format!(
            "\n{}\nterm-autolog started at {} (level={})\n{}\n",
            "=".repeat(80),
            timestamp(),
            level,
            "=".repeat(80)
        ));
        logger
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn write_record(&mut self, record: &log::Record<'_>) {
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        self.write_raw(&line);
        if self.mirror_stderr {
            let _ = std::io::stderr().write_all(line.as_bytes());
        }
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

struct LogBridge {
    logger: Mutex<DebugLogger>,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            self.logger.lock().write_record(record);
        }
    }

    fn flush(&self) {
        if let Some(ref mut file) = self.logger.lock().file {
            let _ = file.flush();
        }
    }
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Parse a `RUST_LOG` value into a level. Only the bare-level form is
/// understood (`debug`, `warn`, ...); module directives fall back to `Info`.
fn level_from_env(value: &str) -> log::LevelFilter {
    value
        .split(',')
        .find_map(|part| part.trim().parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info)
}

/// Route all `log` records to the debug log file.
///
/// Level precedence: `cli_level`, then `RUST_LOG`, then `Info`. The config
/// file level is applied later with [`set_level`]. Calling this twice only
/// adjusts the level.
pub fn init_log_bridge(cli_level: Option<log::LevelFilter>) {
    let env = std::env::var("RUST_LOG").ok().filter(|v| !v.trim().is_empty());
    let level = cli_level
        .or_else(|| env.as_deref().map(level_from_env))
        .unwrap_or(log::LevelFilter::Info);

    let mut installed = false;
    let bridge = BRIDGE.get_or_init(|| {
        installed = true;
        LogBridge {
            logger: Mutex::new(DebugLogger::new(level, env.is_some())),
        }
    });
    if installed && log::set_logger(bridge).is_err() {
        // Another logger got there first; its level rules apply
        return;
    }
    log::set_max_level(level);
}

/// Change the active level, e.g. to the config file's when neither the CLI
/// nor `RUST_LOG` chose one.
pub fn set_level(level: log::LevelFilter) {
    log::set_max_level(level);
}
