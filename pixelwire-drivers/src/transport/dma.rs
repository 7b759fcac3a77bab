//! DMA-backed transport
//!
//! `transmit_bytes` copies (or self-clocking encodes) the frame into a
//! transport-owned buffer and queues a transfer without waiting for it.
//! Completion arrives through the shared interrupt and a
//! [`CompletionTracker`]; readiness also covers the chip's reset interval.
//!
//! # Buffer reuse
//!
//! The buffer grows lazily to the smallest 4-byte multiple holding the
//! frame and is kept for frames of equal or smaller size. Before touching
//! it, the transport busy-polls until the previous transfer is complete.
//!
//! # Degraded mode
//!
//! If the buffer cannot grow or the channel refuses its descriptors, the
//! transport stops sending: transmits are dropped silently and it reports
//! ready so callers never stall on it.

use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use pixelwire_core::completion::{CompletionState, CompletionTracker};
use pixelwire_core::encoding::BitPattern;
use pixelwire_hal::{DmaChannel, MicrosClock, Transport};

/// DMA transport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DmaConfig {
    /// Latch interval the chip needs after each transfer (µs)
    pub reset_us: u32,
    /// Self-clocking expansion for one-wire lines, `None` for clocked lines
    pub pattern: Option<BitPattern>,
}

impl DmaConfig {
    /// Clocked line with no latch interval
    pub const fn clocked() -> Self {
        Self {
            reset_us: 0,
            pattern: None,
        }
    }

    /// One-wire line using `pattern`
    pub const fn self_clocking(pattern: BitPattern, reset_us: u32) -> Self {
        Self {
            reset_us,
            pattern: Some(pattern),
        }
    }
}

/// Transport queuing one DMA transfer per transmit
pub struct DmaTransport<'a, D: DmaChannel, K: MicrosClock> {
    channel: D,
    tracker: &'a CompletionTracker,
    clock: K,
    config: DmaConfig,
    buffer: Vec<u8>,
    prepared_len: Option<usize>,
    degraded: bool,
}

impl<'a, D: DmaChannel, K: MicrosClock> DmaTransport<'a, D, K> {
    /// Create a transport; `tracker` must be registered with the channel's
    /// completion dispatch
    pub fn new(channel: D, tracker: &'a CompletionTracker, clock: K, config: DmaConfig) -> Self {
        Self {
            channel,
            tracker,
            clock,
            config,
            buffer: Vec::new(),
            prepared_len: None,
            degraded: false,
        }
    }

    /// Check whether the transport has given up sending
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Current buffer size in bytes
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn config(&self) -> &DmaConfig {
        &self.config
    }

    fn wait_until_ready(&self) {
        while !self
            .tracker
            .is_ready_to_send(self.config.reset_us, self.clock.now_us())
        {
            core::hint::spin_loop();
        }
    }

    fn degrade(&mut self) {
        self.degraded = true;
        self.buffer = Vec::new();
        self.prepared_len = None;
    }

    /// Grow the buffer to hold `len` bytes, rounded up to a word
    fn reserve(&mut self, len: usize) -> bool {
        let aligned = len.next_multiple_of(4);
        if aligned <= self.buffer.len() {
            return true;
        }
        if self
            .buffer
            .try_reserve_exact(aligned - self.buffer.len())
            .is_err()
        {
            return false;
        }
        debug!(
            "DMA buffer on channel {} grown to {} bytes",
            self.channel.channel(),
            aligned
        );
        self.buffer.resize(aligned, 0);
        true
    }
}

impl<D: DmaChannel, K: MicrosClock> Transport for DmaTransport<'_, D, K> {
    fn begin(&mut self) {
        trace!("DMA transport on channel {} up", self.channel.channel());
    }

    fn begin_transaction(&mut self) {}

    fn transmit_bytes(&mut self, bytes: &[u8]) {
        if self.degraded {
            trace!("degraded DMA transport dropped {} bytes", bytes.len());
            return;
        }

        self.wait_until_ready();

        let len = match self.config.pattern {
            Some(pattern) => pattern.encoded_len(bytes.len()),
            None => bytes.len(),
        };
        if !self.reserve(len) {
            warn!(
                "DMA buffer of {} bytes unavailable, channel {} degraded",
                len,
                self.channel.channel()
            );
            self.degrade();
            return;
        }

        match self.config.pattern {
            Some(pattern) => {
                pattern.encode(bytes, &mut self.buffer[..len]);
            }
            None => self.buffer[..len].copy_from_slice(bytes),
        }

        if self.prepared_len != Some(len) {
            if self.channel.prepare(len).is_err() {
                warn!(
                    "DMA channel {} refused a {} byte frame, degraded",
                    self.channel.channel(),
                    len
                );
                self.degrade();
                return;
            }
            self.prepared_len = Some(len);
        }

        self.tracker.set_sending();
        if self.channel.start(&self.buffer[..len]).is_err() {
            self.tracker.abort();
            warn!(
                "DMA channel {} refused to start, frame dropped",
                self.channel.channel()
            );
        }
    }

    fn end_transaction(&mut self) {}

    fn is_ready_to_update(&self) -> bool {
        self.degraded
            || self
                .tracker
                .is_ready_to_send(self.config.reset_us, self.clock.now_us())
    }
}

impl<D: DmaChannel, K: MicrosClock> Drop for DmaTransport<'_, D, K> {
    fn drop(&mut self) {
        while self.tracker.state() == CompletionState::Sending {
            core::hint::spin_loop();
        }
        self.channel.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};

    struct ManualClock(Cell<u32>);

    impl MicrosClock for ManualClock {
        fn now_us(&self) -> u32 {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct ChannelLog {
        prepares: Vec<usize>,
        starts: Vec<Vec<u8>>,
        released: bool,
        refuse_prepare: bool,
        refuse_start: bool,
    }

    /// Mock DMA channel recording every call
    struct MockChannel<'l> {
        log: &'l RefCell<ChannelLog>,
    }

    impl DmaChannel for MockChannel<'_> {
        type Error = ();

        fn channel(&self) -> u8 {
            2
        }

        fn prepare(&mut self, len: usize) -> Result<(), ()> {
            let mut log = self.log.borrow_mut();
            if log.refuse_prepare {
                return Err(());
            }
            log.prepares.push(len);
            Ok(())
        }

        fn start(&mut self, data: &[u8]) -> Result<(), ()> {
            let mut log = self.log.borrow_mut();
            if log.refuse_start {
                return Err(());
            }
            log.starts.push(data.to_vec());
            Ok(())
        }

        fn release(&mut self) {
            self.log.borrow_mut().released = true;
        }
    }

    #[test]
    fn test_transmit_queues_and_waits_for_reset() {
        let log = RefCell::new(ChannelLog::default());
        let tracker = CompletionTracker::new(2);
        let clock = ManualClock(Cell::new(0));
        let config = DmaConfig {
            reset_us: 50,
            pattern: None,
        };
        let mut transport = DmaTransport::new(MockChannel { log: &log }, &tracker, &clock, config);

        transport.begin_transaction();
        transport.transmit_bytes(&[1, 2, 3, 4, 5]);
        transport.end_transaction();

        assert_eq!(transport.buffer_len(), 8);
        assert!(!transport.is_ready_to_update());
        assert_eq!(log.borrow().starts[0], [1, 2, 3, 4, 5]);

        tracker.dma_finished(10);
        clock.0.set(30);
        assert!(!transport.is_ready_to_update());
        clock.0.set(60);
        assert!(transport.is_ready_to_update());

        drop(transport);
        assert!(log.borrow().released);
    }

    #[test]
    fn test_prepare_only_on_size_change() {
        let log = RefCell::new(ChannelLog::default());
        let tracker = CompletionTracker::new(2);
        let clock = ManualClock(Cell::new(0));
        let mut transport =
            DmaTransport::new(MockChannel { log: &log }, &tracker, &clock, DmaConfig::clocked());

        for frame in [&[1u8, 2][..], &[3, 4][..], &[5][..]] {
            transport.transmit_bytes(frame);
            tracker.dma_finished(0);
        }

        assert_eq!(log.borrow().prepares, [2, 1]);
        // buffer kept for the smaller frame
        assert_eq!(transport.buffer_len(), 4);
        assert_eq!(log.borrow().starts[2], [5]);
    }

    #[test]
    fn test_self_clocking_encodes_into_buffer() {
        let log = RefCell::new(ChannelLog::default());
        let tracker = CompletionTracker::new(2);
        let clock = ManualClock(Cell::new(0));
        let pattern = BitPattern::new(3, 0b100, 0b110).unwrap();
        let mut transport = DmaTransport::new(
            MockChannel { log: &log },
            &tracker,
            &clock,
            DmaConfig::self_clocking(pattern, 300),
        );

        transport.transmit_bytes(&[0b1011_0000]);
        tracker.dma_finished(0);

        assert_eq!(transport.buffer_len(), 4);
        assert_eq!(log.borrow().starts[0], [0b1101_0011, 0b0110_1001, 0b0010_0100]);
    }

    #[test]
    fn test_prepare_failure_degrades() {
        let log = RefCell::new(ChannelLog {
            refuse_prepare: true,
            ..Default::default()
        });
        let tracker = CompletionTracker::new(2);
        let clock = ManualClock(Cell::new(0));
        let mut transport =
            DmaTransport::new(MockChannel { log: &log }, &tracker, &clock, DmaConfig::clocked());

        transport.transmit_bytes(&[1]);
        assert!(transport.is_degraded());
        assert_eq!(transport.buffer_len(), 0);

        log.borrow_mut().refuse_prepare = false;
        transport.transmit_bytes(&[1]);
        assert!(log.borrow().starts.is_empty());
        assert!(transport.is_ready_to_update());
    }

    #[test]
    fn test_refused_start_drops_frame_only() {
        let log = RefCell::new(ChannelLog {
            refuse_start: true,
            ..Default::default()
        });
        let tracker = CompletionTracker::new(2);
        let clock = ManualClock(Cell::new(0));
        let mut transport =
            DmaTransport::new(MockChannel { log: &log }, &tracker, &clock, DmaConfig::clocked());

        transport.transmit_bytes(&[1]);
        assert!(!transport.is_degraded());
        assert_eq!(tracker.state(), CompletionState::Idle);

        log.borrow_mut().refuse_start = false;
        transport.transmit_bytes(&[2]);
        assert_eq!(log.borrow().starts[0], [2]);
        tracker.dma_finished(0);
    }
}
