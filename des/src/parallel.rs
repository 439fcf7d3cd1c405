//! Parallel execution of independent EventLoop scenarios
//!
//! Each scenario is built, run and summarised on a rayon worker. Nothing is
//! shared between scenarios, so an `EventLoop` never crosses a thread
//! boundary: only the builder (shared by reference) and the collected stats
//! (sent back) need to be thread-safe.
//!
//! # Example
//!
//! ```rust
//! use des::parallel::{ParallelRunner, simple_progress_reporter};
//! # use des::{Agent, EventLoop};
//! # struct Counter(usize);
//! # impl Agent<u8, usize> for Counter {
//! #     fn stats(&self) -> usize { self.0 }
//! # }
//!
//! let results = ParallelRunner::new(8, |scenario_id| {
//!     let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(Counter(scenario_id))];
//!     EventLoop::new(vec![(0.0, 1)], agents)
//! })
//! .progress(simple_progress_reporter(4))
//! .num_threads(2)
//! .run(100.0);
//!
//! assert_eq!(results.len(), 8);
//! ```
//!
//! # Determinism
//!
//! Results come back in scenario order regardless of thread count. They are
//! reproducible as long as the builder derives every seed from its inputs and
//! agents only draw from seeded generators.
//!
//! # Error Handling
//!
//! A panic inside one scenario is caught and reported as `Err(String)` for
//! that scenario; the others run to completion.

use crate::EventLoop;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Executes multiple EventLoop scenarios in parallel
pub struct ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    num_scenarios: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<ProgressCallback>,
    _marker: PhantomData<fn() -> (T, S)>,
}

impl<T, S, F> ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    /// `builder` receives the scenario id and returns a fresh loop.
    pub fn new(num_scenarios: usize, builder: F) -> Self {
        ParallelRunner {
            num_scenarios,
            builder,
            num_threads: None,
            progress_callback: None,
            _marker: PhantomData,
        }
    }

    /// Use a dedicated pool of `n` threads instead of rayon's global pool.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Called with `(completed, total)` after each scenario finishes.
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Run every scenario up to `run_until` and return the agents' stats,
    /// one entry per scenario in scenario order.
    pub fn run(self, run_until: f64) -> Vec<Result<Vec<S>, String>> {
        let progress_counter = AtomicUsize::new(0);

        let execute = || {
            (0..self.num_scenarios)
                .into_par_iter()
                .map(|scenario_id| {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let mut event_loop = (self.builder)(scenario_id);
                        event_loop.run(run_until);
                        event_loop.stats()
                    }));

                    let completed = progress_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(completed, self.num_scenarios);
                    }

                    result.map_err(|panic| {
                        if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "Unknown panic".to_string()
                        }
                    })
                })
                .collect()
        };

        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|error| warn!(%error, threads = n, "falling back to the global rayon pool"))
                .ok()
        });

        match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }
    }
}

/// Progress callback that logs every `interval` completed scenarios.
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            info!(completed, total, "scenarios finished");
        }
    }
}
