use std::time::{Duration, Instant};

/// The point in time after which the solver's unknown is put down to the
/// timeout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    start: Instant,
    length: Duration,
}

impl Deadline {
    pub(crate) fn after(length: Duration) -> Self {
        Self {
            start: Instant::now(),
            length,
        }
    }

    pub(crate) fn expired(&self) -> bool {
        self.start.elapsed() >= self.length
    }
}
