use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;




// ============================================================================
/**
 * Completed-item counters shared between a set of workers and the thread
 * that reports on them. Each worker only ever increments its own slot.
 */
pub struct WorkerProgress {
    done: Vec<AtomicUsize>,
    per_worker: usize,
    started: Instant,
}


/**
 * A progress message emitted every time a running count crosses the next
 * whole-percent mark
 */
pub struct PercentReporter {
    label: &'static str,
    total: usize,
    next_percent: usize,
}




// ============================================================================
impl WorkerProgress {
    pub fn new(num_workers: usize, per_worker: usize) -> Self {
        Self {
            done: (0..num_workers).map(|_| AtomicUsize::new(0)).collect(),
            per_worker,
            started: Instant::now(),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.done.len()
    }

    /**
     * Record that the given worker has finished one more item.
     */
    pub fn advance(&self, worker: usize) {
        self.done[worker].fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self, worker: usize) -> usize {
        self.done[worker].load(Ordering::Relaxed)
    }

    pub fn total_completed(&self) -> usize {
        (0..self.num_workers()).map(|n| self.completed(n)).sum()
    }

    /**
     * Return the completion percentage of each worker.
     */
    pub fn percentages(&self) -> Vec<f64> {
        (0..self.num_workers())
            .map(|n| if self.per_worker == 0 {
                100.0
            } else {
                100.0 * self.completed(n) as f64 / self.per_worker as f64
            })
            .collect()
    }

    pub fn report(&self) {
        let summary: Vec<String> = self.percentages()
            .iter()
            .enumerate()
            .map(|(n, p)| format!("{:.1}% at core {}", p, n + 1))
            .collect();
        let total = self.per_worker * self.num_workers();
        log::info!("{} of {} done: {} [{:.1} s]",
            self.total_completed(),
            total,
            summary.join(", "),
            self.started.elapsed().as_secs_f64());
    }
}




// ============================================================================
impl PercentReporter {
    pub fn new(label: &'static str, total: usize) -> Self {
        Self { label, total, next_percent: 0 }
    }

    /**
     * Log a message if `count` items out of the total have crossed the next
     * whole-percent mark.
     */
    pub fn update(&mut self, count: usize) {
        if self.total == 0 {
            return
        }
        let percent = 100 * count / self.total;

        if percent >= self.next_percent {
            log::debug!("{}: {}% done", self.label, percent);
            self.next_percent = percent + 1;
        }
    }
}
