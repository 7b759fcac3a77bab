//! SPI clocked transport
//!
//! Wraps an `embedded-hal` [`SpiBus`]. Writes are blocking; a frame is
//! flushed out of the peripheral FIFO on `end_transaction`.
//!
//! The bit order of [`ClockConfig`] is applied by the transport: with
//! `LsbFirst` every byte is reversed before it reaches the bus. `embedded-hal`
//! has no runtime clock configuration, so the bus must be created at the
//! configured rate and mode.

use alloc::vec::Vec;

use embedded_hal::spi::SpiBus;
use pixelwire_hal::{BitOrder, ClockConfig, Transport};

/// Clocked transport over an `embedded-hal` SPI bus
pub struct SpiTransport<S> {
    spi: S,
    config: ClockConfig,
    reversed: Vec<u8>,
    dropped_frames: u32,
    failed: bool,
}

impl<S: SpiBus> SpiTransport<S> {
    pub fn new(spi: S, config: ClockConfig) -> Self {
        Self {
            spi,
            config,
            reversed: Vec::new(),
            dropped_frames: 0,
            failed: false,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Frames lost to bus errors since creation
    pub fn dropped_frames(&self) -> u32 {
        self.dropped_frames
    }

    /// Release the bus
    pub fn free(self) -> S {
        self.spi
    }
}

impl<S: SpiBus> Transport for SpiTransport<S> {
    fn begin(&mut self) {}

    fn begin_transaction(&mut self) {
        self.failed = false;
    }

    fn transmit_bytes(&mut self, bytes: &[u8]) {
        if self.failed {
            return;
        }
        let written = match self.config.bit_order {
            BitOrder::MsbFirst => self.spi.write(bytes),
            BitOrder::LsbFirst => {
                self.reversed.clear();
                self.reversed
                    .extend(bytes.iter().map(|byte| byte.reverse_bits()));
                self.spi.write(&self.reversed)
            }
        };
        if written.is_err() {
            warn!("SPI write of {} bytes failed, frame dropped", bytes.len());
            self.failed = true;
        }
    }

    fn end_transaction(&mut self) {
        if !self.failed && self.spi.flush().is_err() {
            warn!("SPI flush failed, frame dropped");
            self.failed = true;
        }
        if self.failed {
            self.dropped_frames = self.dropped_frames.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use embedded_hal::spi::{ErrorKind, ErrorType};

    /// Mock SPI bus capturing written bytes
    struct MockSpi {
        written: Vec<u8>,
        flushes: u32,
        fail_writes: bool,
    }

    impl MockSpi {
        fn new() -> Self {
            Self {
                written: Vec::new(),
                flushes: 0,
                fail_writes: false,
            }
        }
    }

    impl ErrorType for MockSpi {
        type Error = ErrorKind;
    }

    impl SpiBus for MockSpi {
        fn read(&mut self, words: &mut [u8]) -> Result<(), ErrorKind> {
            words.fill(0);
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), ErrorKind> {
            if self.fail_writes {
                return Err(ErrorKind::Other);
            }
            self.written.extend_from_slice(words);
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), ErrorKind> {
            read.fill(0);
            self.write(write)
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), ErrorKind> {
            self.written.extend_from_slice(words);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ErrorKind> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_frame_is_written_and_flushed() {
        let mut transport = SpiTransport::new(MockSpi::new(), ClockConfig::with_frequency(4_000_000));

        transport.begin();
        transport.begin_transaction();
        transport.transmit_bytes(&[1, 2]);
        transport.transmit_bytes(&[3]);
        transport.end_transaction();

        assert_eq!(transport.config().frequency_hz, 4_000_000);
        assert!(transport.is_ready_to_update());
        let spi = transport.free();
        assert_eq!(spi.written, [1, 2, 3]);
        assert_eq!(spi.flushes, 1);
    }

    #[test]
    fn test_lsb_first_reverses_each_byte() {
        let config = ClockConfig {
            bit_order: BitOrder::LsbFirst,
            ..ClockConfig::default()
        };
        let mut transport = SpiTransport::new(MockSpi::new(), config);

        transport.begin_transaction();
        transport.transmit_bytes(&[0x01, 0xC4]);
        transport.transmit_bytes(&[0xFF]);
        transport.end_transaction();

        assert_eq!(transport.free().written, [0x80, 0x23, 0xFF]);
    }

    #[test]
    fn test_write_error_drops_rest_of_frame() {
        let mut spi = MockSpi::new();
        spi.fail_writes = true;
        let mut transport = SpiTransport::new(spi, ClockConfig::default());

        transport.begin_transaction();
        transport.transmit_bytes(&[1]);
        transport.transmit_bytes(&[2]);
        transport.end_transaction();

        assert_eq!(transport.dropped_frames(), 1);
        let spi = transport.free();
        assert_eq!(spi.flushes, 0);
        assert!(spi.written.is_empty());
    }
}
