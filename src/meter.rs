//! Flow meter tick counters.
//!
//! A meter's pulse interrupt and the polling loop run on different execution
//! contexts, so the count is an atomic. Converting ticks to volume is left
//! to the caller.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::protocol::{Message, MeterStatus};

/// Named, monotonically increasing (wrapping) tick counter.
#[derive(Debug)]
pub struct MeterCounter {
    name: String,
    ticks: AtomicU32,
}

impl MeterCounter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticks: AtomicU32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record one pulse. Safe to call from an interrupt callback thread.
    /// Returns the new reading.
    pub fn tick(&self) -> u32 {
        self.ticks.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub fn reading(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Current reading as a MeterStatus report.
    pub fn status(&self) -> Message {
        Message::MeterStatus(MeterStatus {
            meter_name: Some(self.name.clone()),
            meter_reading: Some(self.reading()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn ticks_accumulate() {
        let m = MeterCounter::new("flow0");
        assert_eq!(m.tick(), 1);
        assert_eq!(m.tick(), 2);
        assert_eq!(m.reading(), 2);
    }

    #[test]
    fn concurrent_ticks_not_lost() {
        let m = Arc::new(MeterCounter::new("flow1"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        m.tick();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.reading(), 4000);
    }

    #[test]
    fn status_message() {
        let m = MeterCounter::new("flow0");
        m.tick();
        assert_eq!(
            m.status(),
            Message::MeterStatus(MeterStatus {
                meter_name: Some("flow0".into()),
                meter_reading: Some(1),
            })
        );
    }
}
