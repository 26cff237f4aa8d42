//! Worker loop and result checking

use objectio_common::{Error, Result};
use objectio_unique::{CandidateSource, StatsSnapshot, UniqueRegistry};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

/// Workload shape
#[derive(Debug, Clone)]
pub struct BenchOptions {
    /// Worker threads
    pub threads: usize,
    /// Insert + create rounds per worker
    pub iterations: usize,
    /// Keep inserted values live until the end
    pub hold: bool,
    /// Value registered before the workers start
    pub pin: Option<u64>,
}

impl BenchOptions {
    /// Reject workloads that would not exercise the registry
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::invalid_argument("threads must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(Error::invalid_argument("iterations must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of a run
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub bits: u32,
    pub threads: usize,
    pub iterations: usize,
    pub pinned: Option<u64>,
    pub inserted: u64,
    pub transient: u64,
    pub held: usize,
    pub exhausted: u64,
    pub elapsed_ms: u128,
    pub ops_per_sec: f64,
    pub stats: StatsSnapshot,
    pub violations: Vec<String>,
}

impl BenchReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Default)]
struct WorkerResult {
    held: Vec<u64>,
    inserted: u64,
    transient: u64,
    exhausted: u64,
    violations: Vec<String>,
}

fn check_value(
    registry: &UniqueRegistry<impl CandidateSource>,
    value: u64,
    what: &str,
    pinned: Option<u64>,
    violations: &mut Vec<String>,
) {
    if value == 0 {
        violations.push(format!("{what} returned zero"));
    }
    if value & !registry.mask() != 0 {
        violations.push(format!("{what} returned {value:#x} outside mask {:#x}", registry.mask()));
    }
    if pinned == Some(value) {
        violations.push(format!("{what} returned pinned value {value:#x}"));
    }
}

fn worker<S: CandidateSource>(
    registry: &UniqueRegistry<S>,
    opts: &BenchOptions,
    pinned: Option<u64>,
) -> WorkerResult {
    let mut result = WorkerResult::default();
    for _ in 0..opts.iterations {
        match registry.try_insert(0) {
            Ok(value) => {
                result.inserted += 1;
                check_value(registry, value, "insert", pinned, &mut result.violations);
                if opts.hold {
                    result.held.push(value);
                } else {
                    registry.remove(value);
                }
            }
            Err(e) => {
                debug!("insert failed: {}", e);
                result.exhausted += 1;
            }
        }

        match registry.try_create() {
            Ok(transient) => {
                result.transient += 1;
                check_value(registry, transient, "create", pinned, &mut result.violations);
            }
            Err(e) => {
                debug!("create failed: {}", e);
                result.exhausted += 1;
            }
        }
    }
    result
}

/// Drive `registry` from `opts.threads` threads, then verify and clean up
///
/// The registry is empty again when this returns.
pub fn run<S: CandidateSource>(registry: &UniqueRegistry<S>, opts: &BenchOptions) -> BenchReport {
    let pinned = opts.pin.map(|candidate| {
        let value = registry.insert(candidate);
        if value != candidate {
            warn!(
                "requested pin {:#x} was unusable, pinned {:#x} instead",
                candidate, value
            );
        }
        value
    });

    let start = Instant::now();
    let results: Vec<WorkerResult> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..opts.threads)
            .map(|_| s.spawn(|| worker(registry, opts, pinned)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });
    let elapsed = start.elapsed();

    let mut violations = Vec::new();
    let mut held = Vec::new();
    let (mut inserted, mut transient, mut exhausted) = (0, 0, 0);
    for result in results {
        inserted += result.inserted;
        transient += result.transient;
        exhausted += result.exhausted;
        held.extend(result.held);
        violations.extend(result.violations);
    }

    let distinct: HashSet<u64> = held.iter().copied().collect();
    if distinct.len() != held.len() {
        violations.push(format!(
            "{} duplicate values held at once",
            held.len() - distinct.len()
        ));
    }

    let expected_live = held.len() + usize::from(pinned.is_some());
    let live = registry.len();
    if live != expected_live {
        violations.push(format!("registry holds {live} values, expected {expected_live}"));
    }

    for value in held.iter().copied().chain(pinned) {
        registry.remove(value);
    }
    if !registry.is_empty() {
        violations.push(format!("{} values left after cleanup", registry.len()));
    }

    let ops = inserted + transient;
    let secs = elapsed.as_secs_f64();
    BenchReport {
        bits: registry.bits(),
        threads: opts.threads,
        iterations: opts.iterations,
        pinned,
        inserted,
        transient,
        held: held.len(),
        exhausted,
        elapsed_ms: elapsed.as_millis(),
        ops_per_sec: if secs > 0.0 { ops as f64 / secs } else { 0.0 },
        stats: registry.stats().snapshot(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectio_common::UniqueConfig;

    fn opts(threads: usize, iterations: usize, hold: bool) -> BenchOptions {
        BenchOptions {
            threads,
            iterations,
            hold,
            pin: None,
        }
    }

    #[test]
    fn test_validate_options() {
        assert!(opts(1, 1, false).validate().is_ok());
        assert!(matches!(
            opts(0, 10, false).validate(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            opts(4, 0, true).validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    #[should_panic(expected = "candidate source failed")]
    fn test_worker_panic_propagates() {
        let registry = UniqueRegistry::with_source(&UniqueConfig::default(), || -> u64 {
            panic!("candidate source failed")
        })
        .unwrap();
        // insert(0) has to draw, so every worker hits the source
        run(&registry, &opts(2, 1, false));
    }

    #[test]
    fn test_churn_run_is_clean() {
        let registry = UniqueRegistry::default();
        let report = run(&registry, &opts(4, 200, false));

        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.inserted, 800);
        assert_eq!(report.transient, 800);
        assert_eq!(report.held, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_hold_run_in_narrow_space() {
        let registry = UniqueRegistry::new(&UniqueConfig::with_bits(12)).unwrap();
        let report = run(
            &registry,
            &BenchOptions {
                pin: Some(0x123),
                ..opts(4, 100, true)
            },
        );

        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.pinned, Some(0x123));
        assert_eq!(report.held, 400);
        assert_eq!(report.bits, 12);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_exhaustion_is_counted_not_violated() {
        let config = UniqueConfig::with_bits(3).max_attempts(1000);
        let registry = UniqueRegistry::new(&config).unwrap();
        // 7 usable values, 20 requested holds: 13 inserts and 14 creates
        // find the space full
        let report = run(&registry, &opts(1, 20, true));

        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.held, 7);
        assert_eq!(report.inserted, 7);
        assert_eq!(report.transient, 6);
        assert_eq!(report.exhausted, 27);
        assert_eq!(report.stats.exhausted, 27);
    }

    #[test]
    fn test_report_serializes() {
        let registry = UniqueRegistry::default();
        let report = run(&registry, &opts(1, 1, false));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["threads"], 1);
        assert!(json["violations"].as_array().unwrap().is_empty());
    }
}
