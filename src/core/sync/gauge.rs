/*!
 * In-Flight Gauge
 * Tracks work handed to an execution model so release can drain it
 */

use parking_lot::{Condvar, Mutex};

/// Counter of submitted-but-unfinished jobs with a blocking drain
#[derive(Default)]
pub struct InFlightGauge {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlightGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) {
        *self.count.lock() += 1;
    }

    pub fn exit(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    pub fn current(&self) -> usize {
        *self.count.lock()
    }

    /// Block until every entered job has exited
    pub fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_idle_drains() {
        let gauge = Arc::new(InFlightGauge::new());
        for _ in 0..4 {
            gauge.enter();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gauge = gauge.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(20));
                    gauge.exit();
                })
            })
            .collect();

        gauge.wait_idle();
        assert_eq!(gauge.current(), 0);
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
