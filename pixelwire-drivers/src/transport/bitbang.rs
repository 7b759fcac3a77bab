//! Bit-banged clocked transport
//!
//! Drives a two-wire clock/data line from GPIO. Each bit is set on the data
//! pin while the clock is low and latched by the chip on the rising edge.
//!
//! ```text
//! data  ──X═══bit═══X═══bit═══X──
//! clock ____/‾‾‾‾\____/‾‾‾‾\____
//!            ↑ sample  ↑ sample
//! ```

use pixelwire_hal::{BitOrder, OutputPin, Transport};

/// Clocked transport over two GPIO output pins
pub struct BitBangTransport<D, K> {
    data: D,
    clock: K,
    bit_order: BitOrder,
}

impl<D: OutputPin, K: OutputPin> BitBangTransport<D, K> {
    /// Create an MSB-first transport
    pub fn new(data: D, clock: K) -> Self {
        Self::with_bit_order(data, clock, BitOrder::MsbFirst)
    }

    pub fn with_bit_order(data: D, clock: K, bit_order: BitOrder) -> Self {
        Self {
            data,
            clock,
            bit_order,
        }
    }

    /// Release the pins
    pub fn free(self) -> (D, K) {
        (self.data, self.clock)
    }

    fn write_bit(&mut self, high: bool) {
        self.data.set_state(high);
        self.clock.set_high();
        self.clock.set_low();
    }
}

impl<D: OutputPin, K: OutputPin> Transport for BitBangTransport<D, K> {
    fn begin(&mut self) {
        self.clock.set_low();
        self.data.set_low();
    }

    fn begin_transaction(&mut self) {}

    fn transmit_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            for i in 0..8 {
                let bit = match self.bit_order {
                    BitOrder::MsbFirst => (byte >> (7 - i)) & 1,
                    BitOrder::LsbFirst => (byte >> i) & 1,
                };
                self.write_bit(bit == 1);
            }
        }
    }

    fn end_transaction(&mut self) {
        self.data.set_low();
    }
}
