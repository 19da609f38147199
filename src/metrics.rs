//! Minimal process-local counters for template compilation and execution.
use std::sync::atomic::{AtomicU64, Ordering};

static TEMPLATES_COMPILED: AtomicU64 = AtomicU64::new(0);
static COMPILE_FAILURES: AtomicU64 = AtomicU64::new(0);
static RUNS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static RUNS_HALTED: AtomicU64 = AtomicU64::new(0);
static RUNS_ABORTED: AtomicU64 = AtomicU64::new(0);
static UNIMPLEMENTED: AtomicU64 = AtomicU64::new(0);

pub fn inc_templates_compiled() { TEMPLATES_COMPILED.fetch_add(1, Ordering::Relaxed); }
pub fn inc_compile_failures() { COMPILE_FAILURES.fetch_add(1, Ordering::Relaxed); }
pub fn inc_runs_completed() { RUNS_COMPLETED.fetch_add(1, Ordering::Relaxed); }
pub fn inc_runs_halted() { RUNS_HALTED.fetch_add(1, Ordering::Relaxed); }
pub fn inc_runs_aborted() { RUNS_ABORTED.fetch_add(1, Ordering::Relaxed); }
pub fn inc_unimplemented() { UNIMPLEMENTED.fetch_add(1, Ordering::Relaxed); }

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub templates_compiled: u64,
    pub compile_failures: u64,
    pub runs_completed: u64,
    pub runs_halted: u64,
    pub runs_aborted: u64,
    pub unimplemented: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        templates_compiled: TEMPLATES_COMPILED.load(Ordering::Relaxed),
        compile_failures: COMPILE_FAILURES.load(Ordering::Relaxed),
        runs_completed: RUNS_COMPLETED.load(Ordering::Relaxed),
        runs_halted: RUNS_HALTED.load(Ordering::Relaxed),
        runs_aborted: RUNS_ABORTED.load(Ordering::Relaxed),
        unimplemented: UNIMPLEMENTED.load(Ordering::Relaxed),
    }
}
