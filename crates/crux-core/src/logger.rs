//! Process-wide logging setup for the crux binaries.
//!
//! Library crates only talk to the `log` facade (or `tracing` spans under the
//! `tracing` feature). The chosen level applies to the `crux*` crates; image
//! and CLI dependencies are capped at `warn` so a `debug` run shows search
//! and detection details without decoder chatter.
//!
//! Lines look like `[  0.012s  INFO route::search] message`.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const CRUX_TARGETS: [&str; 5] = ["crux", "crux_core", "crux_aruco", "crux_marker", "crux_route"];

fn is_crux_target(target: &str) -> bool {
    let krate = target.split("::").next().unwrap_or(target);
    CRUX_TARGETS.contains(&krate)
}

fn dependency_level(level: LevelFilter) -> LevelFilter {
    level.min(LevelFilter::Warn)
}

fn format_line(elapsed: f64, record: &Record) -> String {
    let target = record.target();
    format!(
        "[{:7.3}s {:>5} {}] {}",
        elapsed,
        record.level(),
        target.strip_prefix("crux_").unwrap_or(target),
        record.args()
    )
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let max = if is_crux_target(metadata.target()) {
            self.level
        } else {
            dependency_level(self.level)
        };
        metadata.level() <= max
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(self.started.elapsed().as_secs_f64(), record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger; `level` applies to the crux crates.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// `EnvFilter` directive equivalent to [`init_with_level`]'s filtering,
/// e.g. `warn,crux=debug,crux_core=debug,...` for `debug`.
pub fn default_directive(level: LevelFilter) -> String {
    let crux = level.to_string().to_ascii_lowercase();
    let deps = dependency_level(level).to_string().to_ascii_lowercase();
    std::iter::once(deps)
        .chain(CRUX_TARGETS.iter().map(|t| format!("{t}={crux}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install a `tracing-subscriber` fmt subscriber. `RUST_LOG` wins when set;
/// otherwise the filter is [`default_directive`] for `level`. Span close
/// events carry timings.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn meta(level: Level, target: &str) -> Metadata<'_> {
        Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn crux_targets_are_recognized_by_crate() {
        assert!(is_crux_target("crux"));
        assert!(is_crux_target("crux_route::search"));
        assert!(is_crux_target("crux_aruco"));
        assert!(!is_crux_target("cruxfoo"));
        assert!(!is_crux_target("png::decoder"));
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let logger = StderrLogger {
            level: LevelFilter::Debug,
            started: Instant::now(),
        };
        assert!(logger.enabled(&meta(Level::Debug, "crux_route::search")));
        assert!(!logger.enabled(&meta(Level::Debug, "image::codecs")));
        assert!(logger.enabled(&meta(Level::Warn, "image::codecs")));
        assert!(!logger.enabled(&meta(Level::Trace, "crux_marker")));
    }

    #[test]
    fn directive_follows_the_requested_level() {
        assert_eq!(
            default_directive(LevelFilter::Debug),
            "warn,crux=debug,crux_core=debug,crux_aruco=debug,crux_marker=debug,crux_route=debug"
        );
        assert!(default_directive(LevelFilter::Error).starts_with("error,crux=error,"));
        assert!(default_directive(LevelFilter::Off).starts_with("off,crux=off,"));
    }

    #[test]
    fn line_drops_the_crate_prefix() {
        let line = format_line(
            1.5,
            &Record::builder()
                .args(format_args!("stance has 4 limbs"))
                .level(Level::Info)
                .target("crux_route::search")
                .build(),
        );
        assert_eq!(line, "[  1.500s  INFO route::search] stance has 4 limbs");
    }
}
