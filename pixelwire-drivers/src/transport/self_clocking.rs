//! Self-clocking transport over a clocked line
//!
//! Only the data line of a clocked peripheral is wired to the chip. Every
//! protocol bit is expanded into a [`BitPattern`] and the peripheral
//! clock must run at [`SelfClockingTransport::bit_rate_hz`]. The frame ends
//! with the chip's reset interval sent as zero bits, which holds the line
//! low long enough to latch.

use alloc::vec::Vec;

use pixelwire_core::encoding::{BitPattern, OneWireTiming, PatternError};
use pixelwire_hal::Transport;

/// One-wire transport built from a clocked transport
pub struct SelfClockingTransport<T> {
    inner: T,
    pattern: BitPattern,
    period_ns: u32,
    reset_us: u32,
    buffer: Vec<u8>,
}

impl<T: Transport> SelfClockingTransport<T> {
    pub fn new(inner: T, pattern: BitPattern, period_ns: u32, reset_us: u32) -> Self {
        Self {
            inner,
            pattern,
            period_ns,
            reset_us,
            buffer: Vec::new(),
        }
    }

    /// Derive the pattern from a chip timing at `width` bits per logical bit
    pub fn from_timing(inner: T, timing: OneWireTiming, width: u8) -> Result<Self, PatternError> {
        let pattern = BitPattern::from_timing(timing, width)?;
        Ok(Self::new(inner, pattern, timing.period_ns, timing.reset_us))
    }

    pub fn pattern(&self) -> &BitPattern {
        &self.pattern
    }

    /// Clock rate the wrapped transport must run at
    pub fn bit_rate_hz(&self) -> u32 {
        self.pattern.bit_rate_hz(self.period_ns)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn free(self) -> T {
        self.inner
    }

    /// Resize the scratch buffer, zeroed; false if memory ran out
    fn prepare(&mut self, len: usize) -> bool {
        if len > self.buffer.capacity()
            && self
                .buffer
                .try_reserve_exact(len - self.buffer.len())
                .is_err()
        {
            warn!("self-clocking buffer of {} bytes unavailable", len);
            return false;
        }
        self.buffer.clear();
        self.buffer.resize(len, 0);
        true
    }
}

impl<T: Transport> Transport for SelfClockingTransport<T> {
    fn begin(&mut self) {
        self.inner.begin();
    }

    fn begin_transaction(&mut self) {
        self.inner.begin_transaction();
    }

    fn transmit_bytes(&mut self, bytes: &[u8]) {
        if !self.prepare(self.pattern.encoded_len(bytes.len())) {
            return;
        }
        self.pattern.encode(bytes, &mut self.buffer);
        self.inner.transmit_bytes(&self.buffer);
    }

    fn end_transaction(&mut self) {
        let reset = self.pattern.reset_len(self.reset_us, self.period_ns);
        if reset > 0 && self.prepare(reset) {
            self.inner.transmit_bytes(&self.buffer);
        }
        self.inner.end_transaction();
    }

    fn is_ready_to_update(&self) -> bool {
        self.inner.is_ready_to_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[derive(Default)]
    struct Capture {
        writes: Vec<Vec<u8>>,
        ended: bool,
    }

    impl Transport for Capture {
        fn begin(&mut self) {}

        fn begin_transaction(&mut self) {}

        fn transmit_bytes(&mut self, bytes: &[u8]) {
            self.writes.push(bytes.to_vec());
        }

        fn end_transaction(&mut self) {
            self.ended = true;
        }
    }

    #[test]
    fn test_expands_payload_and_appends_reset() {
        let mut transport =
            SelfClockingTransport::from_timing(Capture::default(), OneWireTiming::WS2812X, 3)
                .unwrap();
        assert_eq!(transport.bit_rate_hz(), 2_400_000);

        transport.begin_transaction();
        transport.transmit_bytes(&[0b1011_0000]);
        transport.end_transaction();

        let capture = transport.free();
        assert!(capture.ended);
        assert_eq!(capture.writes[0], [0b1101_0011, 0b0110_1001, 0b0010_0100]);
        // 300 µs at 2.4 Mbit/s
        assert_eq!(capture.writes[1], vec![0u8; 90]);
    }

    #[test]
    fn test_no_reset_write_when_interval_is_zero() {
        let pattern = BitPattern::new(4, 0b1000, 0b1110).unwrap();
        let mut transport = SelfClockingTransport::new(Capture::default(), pattern, 1250, 0);

        transport.transmit_bytes(&[0xFF]);
        transport.transmit_bytes(&[0x00]);
        transport.end_transaction();

        let capture = transport.free();
        assert_eq!(capture.writes.len(), 2);
        assert_eq!(capture.writes[1], [0x88, 0x88, 0x88, 0x88]);
    }
}
