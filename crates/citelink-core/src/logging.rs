//! env_logger setup, routed through indicatif when progress bars are live.

use std::io::Write;

use indicatif::MultiProgress;

const RESET: &str = "\x1b[0m";

fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn level_color(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// Wraps an env_logger and emits through `MultiProgress::suspend` so log
/// lines never tear through active progress bars. Only installed when
/// stderr is a TTY, so color is unconditional here.
struct BarSafeLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl log::Log for BarSafeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        let level = record.level();
        let line = format!(
            "[{}{}{RESET}] {}",
            level_color(level),
            level_label(level),
            record.args()
        );
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger. RUST_LOG overrides the flag-derived default.
/// Pass `Some(multi)` when progress bars are active on the same stderr.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    let default_level = match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    let env = env_logger::Env::default().default_filter_or(default_level);

    match multi {
        Some(multi) => {
            let inner = env_logger::Builder::from_env(env).build();
            log::set_max_level(inner.filter());
            let logger = BarSafeLogger {
                inner,
                multi: multi.clone(),
            };
            log::set_boxed_logger(Box::new(logger)).expect("failed to init logger");
        }
        None => {
            // plain stderr, no ANSI, keep the padded level label
            env_logger::Builder::from_env(env)
                .format(|buf, record| {
                    writeln!(buf, "[{}] {}", level_label(record.level()), record.args())
                })
                .init();
        }
    }
}
