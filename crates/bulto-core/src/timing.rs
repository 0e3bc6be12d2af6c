//! Opt-in latency sampling for reconstruction stages.
//!
//! Samples land in a process-wide buffer so stages executed on bulk-search
//! workers are reported alongside the ones run on the main thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::json;

/// Environment variable that turns sampling on.
pub const TIMING_ENV: &str = "BULTO_TIMING";

/// Per-stage latency summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: String,
    pub samples: usize,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
}

/// All stage summaries, sorted by stage name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingReport {
    pub stages: Vec<StageTiming>,
}

static ENABLED: AtomicBool = AtomicBool::new(false);
static SAMPLES: Mutex<Vec<(String, Duration)>> = Mutex::new(Vec::new());

/// `true` when [`TIMING_ENV`] holds `1`, `true`, `yes` or `on`.
#[must_use]
pub fn enabled_from_env() -> bool {
    std::env::var(TIMING_ENV).is_ok_and(|v| is_truthy(&v))
}

/// Turn sampling on or off. Turning it off discards pending samples.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear();
    }
}

#[must_use]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Discard pending samples.
pub fn clear() {
    SAMPLES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// Run `f`, recording its wall time under `stage` when sampling is on.
pub fn timed<R>(stage: &str, f: impl FnOnce() -> R) -> R {
    if !is_enabled() {
        return f();
    }
    let started = Instant::now();
    let out = f();
    record(stage, started.elapsed());
    out
}

fn record(stage: &str, elapsed: Duration) {
    SAMPLES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((stage.to_string(), elapsed));
}

/// Drain pending samples into a report.
#[must_use]
pub fn take_report() -> TimingReport {
    let drained = std::mem::take(&mut *SAMPLES.lock().unwrap_or_else(PoisonError::into_inner));

    let mut by_stage: BTreeMap<String, Vec<Duration>> = BTreeMap::new();
    for (stage, elapsed) in drained {
        by_stage.entry(stage).or_default().push(elapsed);
    }

    let stages = by_stage
        .into_iter()
        .map(|(stage, mut values)| {
            values.sort_unstable();
            StageTiming {
                samples: values.len(),
                p50: percentile(&values, 50),
                p95: percentile(&values, 95),
                p99: percentile(&values, 99),
                max: values.last().copied().unwrap_or_default(),
                stage,
            }
        })
        .collect();

    TimingReport { stages }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Summary for one stage.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageTiming> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// JSON form, durations in microseconds.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let stages: Vec<_> = self
            .stages
            .iter()
            .map(|s| {
                json!({
                    "stage": s.stage,
                    "samples": s.samples,
                    "p50_us": s.p50.as_micros(),
                    "p95_us": s.p95.as_micros(),
                    "p99_us": s.p99.as_micros(),
                    "max_us": s.max.as_micros(),
                })
            })
            .collect();
        json!({ "timing": stages })
    }

    /// Fixed-width table for stderr.
    #[must_use]
    pub fn render_table(&self) -> String {
        use std::fmt::Write as _;

        if self.stages.is_empty() {
            return "no timing samples\n".to_string();
        }
        let mut out = format!(
            "{:<24} {:>7} {:>9} {:>9} {:>9} {:>9}\n",
            "stage", "n", "p50", "p95", "p99", "max"
        );
        out.push_str(&"-".repeat(72));
        out.push('\n');
        for s in &self.stages {
            let _ = writeln!(
                out,
                "{:<24} {:>7} {:>9} {:>9} {:>9} {:>9}",
                s.stage,
                s.samples,
                human(s.p50),
                human(s.p95),
                human(s.p99),
                human(s.max)
            );
        }
        out
    }
}

/// Nearest-rank percentile over an ascending slice.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (pct.min(100) * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

fn human(d: Duration) -> String {
    let us = d.as_micros();
    match us {
        0..1_000 => format!("{us}µs"),
        1_000..1_000_000 => format!("{}.{:03}ms", us / 1_000, us % 1_000),
        _ => format!("{}.{:03}s", us / 1_000_000, (us % 1_000_000) / 1_000),
    }
}

fn is_truthy(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|t| value.trim().eq_ignore_ascii_case(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    static GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn disabled_records_nothing() {
        let _g = GUARD.lock().expect("guard");
        set_enabled(false);
        assert_eq!(timed("off", || 3_u8), 3);
        assert!(take_report().is_empty());
    }

    #[test]
    fn enabled_records_stage() {
        let _g = GUARD.lock().expect("guard");
        set_enabled(true);
        clear();
        assert_eq!(timed("on", || 9_u8), 9);
        let report = take_report();
        set_enabled(false);
        let on = report.stage("on").expect("stage recorded");
        assert_eq!(on.samples, 1);
    }

    #[test]
    fn samples_from_other_threads_are_collected() {
        let _g = GUARD.lock().expect("guard");
        set_enabled(true);
        clear();
        std::thread::scope(|s| {
            s.spawn(|| timed("worker", || ()));
        });
        let report = take_report();
        set_enabled(false);
        assert!(report.stage("worker").is_some());
    }

    #[test]
    fn percentiles_use_nearest_rank() {
        let _g = GUARD.lock().expect("guard");
        clear();
        for us in [3_000, 1_000, 2_000] {
            record("assign", Duration::from_micros(us));
        }
        record("partition", Duration::from_micros(10));
        let report = take_report();
        let assign = report.stage("assign").expect("assign");
        assert_eq!(assign.p50, Duration::from_micros(2_000));
        assert_eq!(assign.p99, Duration::from_micros(3_000));
        assert_eq!(assign.max, Duration::from_micros(3_000));
        assert_eq!(report.stage("partition").map(|s| s.samples), Some(1));
    }

    #[test]
    fn renders_table_and_json() {
        let _g = GUARD.lock().expect("guard");
        clear();
        record("view.shipment", Duration::from_micros(1_500));
        let report = take_report();
        assert!(report.render_table().contains("view.shipment"));
        assert!(report.render_table().contains("1.500ms"));
        let json = report.to_json();
        assert_eq!(json["timing"][0]["stage"], "view.shipment");
        assert_eq!(json["timing"][0]["p50_us"], 1_500);
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("ON"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
    }
}
