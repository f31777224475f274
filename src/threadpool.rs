//! Thread pool contract (SPEC_FULL §G): spec.md treats the scheduler as an
//! external collaborator; this pins its contract to a trait plus one
//! concrete, dependency-free implementation.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Fans `count` independent, index-addressed units of work across a
/// fixed-width worker set and returns only once every unit has completed —
/// the "single barrier" of spec §5.
pub trait BlockPool {
    fn run_indexed(&self, count: usize, task: &(dyn Fn(usize) + Sync));
}

/// `std::thread::scope`-backed pool with a work-stealing atomic cursor.
pub struct ScopedThreadPool {
    threads: usize,
}

impl ScopedThreadPool {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }
}

impl BlockPool for ScopedThreadPool {
    fn run_indexed(&self, count: usize, task: &(dyn Fn(usize) + Sync)) {
        if count == 0 {
            return;
        }
        let cursor = AtomicUsize::new(0);
        let workers = self.threads.min(count);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = cursor.fetch_add(1, Ordering::Relaxed);
                    if i >= count {
                        break;
                    }
                    task(i);
                });
            }
        });
    }
}
