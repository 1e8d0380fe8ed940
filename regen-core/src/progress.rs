use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_secs(5);

#[derive(Default)]
struct State {
    stage: Mutex<String>,
    blocks_done: AtomicU64,
    blocks_total: AtomicU64,
    bytes_done: AtomicU64,
    bytes_total: AtomicU64,
    running: AtomicBool,
    generation: AtomicU64,
}

impl State {
    /// True while the ticker started as `generation` is the live one.
    fn owns(&self, generation: u64) -> bool {
        self.running.load(Ordering::Relaxed) && self.generation.load(Ordering::Relaxed) == generation
    }
}

/// Periodic progress line on stderr. Disabled instances are no-ops.
#[derive(Clone)]
pub struct Progress {
    enabled: bool,
    state: Arc<State>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, state: Arc::new(State::default()) }
    }

    pub fn set_stage(&self, s: &str) {
        if !self.enabled {
            return;
        }
        if let Ok(mut stage) = self.state.stage.lock() {
            *stage = s.to_string();
        }
    }
    pub fn set_blocks_total(&self, n: u64) {
        self.state.blocks_total.store(n, Ordering::Relaxed);
        self.state.blocks_done.store(0, Ordering::Relaxed);
    }
    pub fn inc_block(&self) {
        self.state.blocks_done.fetch_add(1, Ordering::Relaxed);
    }
    pub fn reset_bytes(&self, total: u64) {
        self.state.bytes_total.store(total, Ordering::Relaxed);
        self.state.bytes_done.store(0, Ordering::Relaxed);
    }
    pub fn add_bytes(&self, n: u64) {
        self.state.bytes_done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn blocks_done(&self) -> u64 {
        self.state.blocks_done.load(Ordering::Relaxed)
    }

    /// Start the ticker; it stops when the returned guard is dropped.
    /// A nested `start` while a ticker runs returns a guard that owns nothing.
    pub fn start(&self) -> ProgressGuard {
        if !self.enabled || self.state.running.swap(true, Ordering::Relaxed) {
            return ProgressGuard { state: self.state.clone(), generation: None };
        }
        // a ticker from an earlier guard may still be asleep; it sees the bump and exits
        let generation = self.state.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let state = self.state.clone();
        thread::spawn(move || {
            let t0 = Instant::now();
            while state.owns(generation) {
                thread::sleep(TICK);
                if !state.owns(generation) {
                    break;
                }
                let stage = state.stage.lock().map(|s| s.clone()).unwrap_or_default();
                let bd = state.blocks_done.load(Ordering::Relaxed);
                let bt = state.blocks_total.load(Ordering::Relaxed);
                let bpd = state.bytes_done.load(Ordering::Relaxed);
                let bpt = state.bytes_total.load(Ordering::Relaxed);
                let bpct = if bpt > 0 { (bpd as f64 / bpt as f64) * 100.0 } else { 0.0 };
                eprintln!(
                    "[{:>4}s] {} | blocks {}/{} | bytes {}%",
                    t0.elapsed().as_secs(),
                    stage,
                    bd,
                    bt,
                    bpct as i32
                );
            }
        });
        ProgressGuard { state: self.state.clone(), generation: Some(generation) }
    }
}

/// Stops the progress ticker on drop, including on error paths.
pub struct ProgressGuard {
    state: Arc<State>,
    generation: Option<u64>,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Some(generation) = self.generation {
            if self.state.generation.load(Ordering::Relaxed) == generation {
                self.state.running.store(false, Ordering::Relaxed);
            }
        }
    }
}
