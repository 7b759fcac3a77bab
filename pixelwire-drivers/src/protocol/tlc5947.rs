//! TLC5947 24-channel 12-bit PWM driver
//!
//! Chips are daisy-chained shift registers of 24 x 12 bits. The stream
//! starts with the highest channel of the last chip, MSB first, two
//! channels per three bytes. A pulse on the latch pin moves the shifted
//! data to the outputs.
//!
//! Pixel `p` occupies channels `3p..3p+3` in the configured order.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use alloc::vec::Vec;

use pixelwire_core::color::{ChannelOrder, PixelColor};
use pixelwire_core::protocol::{color_or_black, Protocol};
use pixelwire_hal::{OutputPin, Transport};

/// PWM channels per chip
pub const CHANNELS_PER_CHIP: usize = 24;

/// Bytes one chip shifts in
pub const BYTES_PER_CHIP: usize = CHANNELS_PER_CHIP * 12 / 8;

const CHANNELS_PER_PIXEL: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tlc5947Config {
    /// Order of a pixel's three channels, lowest channel first
    pub order: ChannelOrder,
    /// Resend every frame even when nothing changed
    pub always_update: bool,
}

impl Default for Tlc5947Config {
    fn default() -> Self {
        Self {
            order: ChannelOrder::RGB,
            always_update: false,
        }
    }
}

/// TLC5947 protocol driving a clocked transport and a latch pin
pub struct Tlc5947<T, L> {
    transport: T,
    latch: L,
    config: Tlc5947Config,
    pixel_count: usize,
    levels: Vec<u16>,
    frame: Vec<u8>,
}

/// Chips needed for `pixel_count` pixels
pub fn chip_count(pixel_count: usize) -> usize {
    (pixel_count * CHANNELS_PER_PIXEL).div_ceil(CHANNELS_PER_CHIP)
}

impl<T: Transport, L: OutputPin> Tlc5947<T, L> {
    pub fn new(transport: T, latch: L, pixel_count: usize, config: Tlc5947Config) -> Self {
        let chips = chip_count(pixel_count);
        Self {
            transport,
            latch,
            config,
            pixel_count,
            levels: Vec::with_capacity(chips * CHANNELS_PER_CHIP),
            frame: Vec::with_capacity(chips * BYTES_PER_CHIP),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn latch(&self) -> &L {
        &self.latch
    }

    /// Total bytes shifted per frame
    pub fn frame_bytes(&self) -> usize {
        chip_count(self.pixel_count) * BYTES_PER_CHIP
    }
}

impl<'t, T: Transport, L: OutputPin> Tlc5947<&'t mut T, L> {
    pub fn borrowed(
        transport: &'t mut T,
        latch: L,
        pixel_count: usize,
        config: Tlc5947Config,
    ) -> Self {
        Self::new(transport, latch, pixel_count, config)
    }
}

impl<T: Transport, L: OutputPin, C: PixelColor> Protocol<C> for Tlc5947<T, L> {
    fn initialize(&mut self) {
        self.latch.set_low();
        self.transport.begin();
    }

    fn update(&mut self, colors: &[C]) {
        let channels = chip_count(self.pixel_count) * CHANNELS_PER_CHIP;

        self.levels.clear();
        self.levels.resize(channels, 0);
        for index in 0..self.pixel_count {
            let color = color_or_black(colors, index);
            let base = index * CHANNELS_PER_PIXEL;
            let wire = self.config.order.channels().take(CHANNELS_PER_PIXEL);
            for (offset, channel) in wire.enumerate() {
                self.levels[base + offset] = color.channel_bits(channel, 12);
            }
        }

        // Highest channel first, two channels per three bytes
        self.frame.clear();
        for pair in self.levels.rchunks(2) {
            let (high, low) = match *pair {
                [low, high] => (high, low),
                [single] => (single, 0),
                _ => (0, 0),
            };
            self.frame.extend_from_slice(&[
                (high >> 4) as u8,
                (((high & 0x0F) << 4) | (low >> 8)) as u8,
                low as u8,
            ]);
        }

        self.transport.begin_transaction();
        self.transport.transmit_bytes(&self.frame);
        self.transport.end_transaction();

        self.latch.set_high();
        self.latch.set_low();
    }

    fn is_ready_to_update(&self) -> bool {
        self.transport.is_ready_to_update()
    }

    fn always_update(&self) -> bool {
        self.config.always_update
    }
}
