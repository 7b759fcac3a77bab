//! Microsecond time source
//!
//! Latch and reset intervals are measured against a free-running
//! microsecond counter. The counter wraps; callers compare timestamps with
//! wrapping subtraction.

/// Monotonic, wrapping microsecond clock
pub trait MicrosClock {
    /// Current time in microseconds
    fn now_us(&self) -> u32;

    /// Microseconds elapsed since `earlier`, tolerant of one wrap
    fn elapsed_since(&self, earlier: u32) -> u32 {
        self.now_us().wrapping_sub(earlier)
    }
}

impl<K: MicrosClock + ?Sized> MicrosClock for &K {
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }
}

/// Clock backed by the `embassy-time` global time driver
#[cfg(feature = "embassy-time")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy-time")]
impl MicrosClock for EmbassyClock {
    fn now_us(&self) -> u32 {
        // Truncation is the wrap
        embassy_time::Instant::now().as_micros() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct ManualClock(Cell<u32>);

    impl MicrosClock for ManualClock {
        fn now_us(&self) -> u32 {
            self.0.get()
        }
    }

    #[test]
    fn test_elapsed_across_wrap() {
        let clock = ManualClock(Cell::new(10));
        assert_eq!(clock.elapsed_since(u32::MAX - 4), 15);
    }

    #[test]
    fn test_shared_reference_is_a_clock() {
        let clock = ManualClock(Cell::new(300));
        let by_ref = &clock;
        assert_eq!(by_ref.elapsed_since(100), 200);
    }
}
