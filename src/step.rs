//! Named, timed steps.
//!
//! [`with_step`] brackets a unit of work with log records:
//!
//! ```text
//! 2026/10/19 14:02:11 [foundry] start build en
//! 2026/10/19 14:02:11 [foundry] done build en (42ms)
//! 2026/10/19 14:02:11 [foundry] error build es (3ms): foundry: no templates matched glob "t/*.html"
//! ```
//!
//! Steps nest freely; each one logs its own start and end.
//!
//! # The step sink
//!
//! Records go to a single process-wide [`StepSink`]. The default writes to
//! stdout with a timestamp and the `[foundry] ` prefix. [`set_step_logger`]
//! swaps it (tests capture records this way) and `set_step_logger(None)`
//! restores the default.
//!
//! The sink sits behind a reader/writer lock: emitting a record takes the
//! shared lock, replacing the sink takes the exclusive one. A record being
//! written is never split by a replacement, and each record reaches the sink
//! as one complete line.

use crate::error::{FoundryError, Result};
use chrono::NaiveDateTime;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

/// Prefix of every record written by the default sink.
pub const LOG_PREFIX: &str = "[foundry] ";

/// Destination for step records. Each call receives one complete line
/// without a trailing newline.
pub trait StepSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> StepSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Writes `<timestamp> [foundry] <message>` lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl StepSink for StdoutSink {
    fn log(&self, line: &str) {
        let record = stdout_record(chrono::Local::now().naive_local(), line);
        // A closed stdout must not take the pipeline down with it.
        let _ = io::stdout().lock().write_all(record.as_bytes());
    }
}

fn stdout_record(at: NaiveDateTime, line: &str) -> String {
    format!("{} {LOG_PREFIX}{line}\n", at.format("%Y/%m/%d %H:%M:%S"))
}

/// Writes `<prefix><message>` lines to any writer, without timestamps.
pub struct WriterSink<W> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_prefix(writer, "")
    }

    pub fn with_prefix(writer: W, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> StepSink for WriterSink<W> {
    fn log(&self, line: &str) {
        let record = format!("{}{line}\n", self.prefix);
        let _ = self.writer.lock().write_all(record.as_bytes());
    }
}

impl<W> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

static STEP_SINK: LazyLock<RwLock<Arc<dyn StepSink>>> =
    LazyLock::new(|| RwLock::new(Arc::new(StdoutSink)));

/// Replace the process-wide step sink. `None` restores [`StdoutSink`].
pub fn set_step_logger(sink: Option<Arc<dyn StepSink>>) {
    let sink = sink.unwrap_or_else(|| Arc::new(StdoutSink));
    *STEP_SINK.write() = sink;
}

fn emit(line: &str) {
    STEP_SINK.read().log(line);
}

/// Run `body` as the step `name`, logging its start, duration and outcome.
///
/// The body's error is returned unchanged.
pub fn with_step<T, F>(name: &str, body: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    if name.is_empty() {
        return Err(FoundryError::invalid("step name is empty"));
    }

    emit(&format!("start {name}"));
    let start = Instant::now();
    let result = body();
    let elapsed = HumanDuration(round_to_millis(start.elapsed()));
    match &result {
        Ok(_) => emit(&format!("done {name} ({elapsed})")),
        Err(e) => emit(&format!("error {name} ({elapsed}): {e}")),
    }
    result
}

fn round_to_millis(d: Duration) -> Duration {
    let millis = (d.as_nanos() + 500_000) / 1_000_000;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

/// Compact duration rendering: `0s`, `15ms`, `1.25s`, `2m3.5s`, `1h0m2s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = self.0.as_millis();
        if total_ms == 0 {
            return f.write_str("0s");
        }
        if total_ms < 1000 {
            return write!(f, "{total_ms}ms");
        }

        let hours = total_ms / 3_600_000;
        let minutes = (total_ms / 60_000) % 60;
        let secs = (total_ms / 1000) % 60;
        let frac = total_ms % 1000;

        if hours > 0 {
            write!(f, "{hours}h{minutes}m")?;
        } else if minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        write!(f, "{secs}")?;
        if frac > 0 {
            let frac = format!("{frac:03}");
            write!(f, ".{}", frac.trim_end_matches('0'))?;
        }
        f.write_str("s")
    }
}

/// Serializes tests that swap the process-wide sink.
#[cfg(test)]
pub(crate) static SINK_TEST_LOCK: Mutex<()> = parking_lot::const_mutex(());

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Capture records mentioning `needle`; other tests may log concurrently.
    fn capture(needle: &'static str) -> Arc<Mutex<Vec<String>>> {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        set_step_logger(Some(Arc::new(move |line: &str| {
            if line.contains(needle) {
                sink_lines.lock().push(line.to_string())
            }
        })));
        lines
    }

    #[test]
    fn logs_start_and_done() {
        let _guard = SINK_TEST_LOCK.lock();
        let lines = capture("example");

        with_step("example", || Ok(())).unwrap();
        set_step_logger(None);

        let lines = lines.lock();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "start example");
        assert!(lines[1].starts_with("done example ("), "{}", lines[1]);
    }

    #[test]
    fn error_is_logged_and_returned_verbatim() {
        let _guard = SINK_TEST_LOCK.lock();
        let lines = capture("failing");

        let err = with_step("failing", || -> Result<()> {
            Err(FoundryError::NotFound("no templates matched glob \"x\"".into()))
        })
        .unwrap_err();
        set_step_logger(None);

        assert_eq!(err.kind(), ErrorKind::NotFound);
        let lines = lines.lock();
        assert!(lines[1].starts_with("error failing ("), "{}", lines[1]);
        assert!(lines[1].ends_with("): foundry: no templates matched glob \"x\""));
    }

    #[test]
    fn nested_steps_log_independently() {
        let _guard = SINK_TEST_LOCK.lock();
        let lines = capture("-nest");

        with_step("outer-nest", || with_step("inner-nest", || Ok(7))).unwrap();
        set_step_logger(None);

        let lines = lines.lock();
        let order: Vec<&str> = lines
            .iter()
            .map(|l| l.split(" (").next().unwrap())
            .collect();
        assert_eq!(
            order,
            ["start outer-nest", "start inner-nest", "done inner-nest", "done outer-nest"]
        );
    }

    #[test]
    fn step_returns_body_value() {
        let _guard = SINK_TEST_LOCK.lock();
        let _lines = capture("value");
        let value = with_step("value", || Ok("built")).unwrap();
        set_step_logger(None);
        assert_eq!(value, "built");
    }

    #[test]
    fn empty_name_is_invalid_and_body_not_run() {
        let mut ran = false;
        let err = with_step("", || {
            ran = true;
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!ran);
    }

    #[test]
    fn stdout_record_shape() {
        let at = chrono::NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        assert_eq!(
            stdout_record(at, "done build en (42ms)"),
            "2026/03/07 09:05:01 [foundry] done build en (42ms)\n"
        );
    }

    #[test]
    fn clearing_the_logger_detaches_the_custom_sink() {
        let _guard = SINK_TEST_LOCK.lock();
        let lines = capture("detached");
        set_step_logger(None);

        with_step("detached", || Ok(())).unwrap();

        assert!(lines.lock().is_empty());
    }

    #[test]
    fn writer_sink_prefixes_lines() {
        let sink = WriterSink::with_prefix(Vec::new(), LOG_PREFIX);
        sink.log("start a");
        sink.log("done a (1ms)");
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "[foundry] start a\n[foundry] done a (1ms)\n");
    }

    #[test]
    fn durations_render_compactly() {
        let fmt = |ms| HumanDuration(Duration::from_millis(ms)).to_string();
        assert_eq!(fmt(0), "0s");
        assert_eq!(fmt(15), "15ms");
        assert_eq!(fmt(1000), "1s");
        assert_eq!(fmt(1250), "1.25s");
        assert_eq!(fmt(123_500), "2m3.5s");
        assert_eq!(fmt(3_602_000), "1h0m2s");
    }

    #[test]
    fn rounding_to_nearest_millisecond() {
        assert_eq!(round_to_millis(Duration::from_micros(1499)), Duration::from_millis(1));
        assert_eq!(round_to_millis(Duration::from_micros(1500)), Duration::from_millis(2));
        assert_eq!(round_to_millis(Duration::from_micros(400)), Duration::ZERO);
    }
}
