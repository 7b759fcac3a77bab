//! APA102 / SK9822 clocked protocol
//!
//! # Frame format
//!
//! ```text
//! start:  00 00 00 00
//! pixel:  111b bbbb  c0  c1  c2      (5-bit brightness, channels)
//! end:    00 00 00 00  + ceil(n / 16) x 00
//! ```
//!
//! Each chip delays the clock by half a cycle, so the extra end bytes push
//! the last pixels' data through the chain.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use alloc::vec::Vec;

use pixelwire_core::color::{ChannelOrder, PixelColor};
use pixelwire_core::protocol::{color_or_black, Protocol};
use pixelwire_hal::Transport;

const START_FRAME: [u8; 4] = [0; 4];
const PIXEL_FLAG: u8 = 0xE0;
const CHANNELS_PER_PIXEL: usize = 3;

/// Canonical index of the white channel
const WHITE: usize = 3;

/// Source of each pixel's 5-bit brightness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Brightness {
    /// Same brightness for every pixel (0-31, clamped)
    Global(u8),
    /// Upper 5 bits of the color's white channel
    FromWhite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Apa102Config {
    /// Order of the three color channels after the brightness byte
    ///
    /// Must be a three-channel order. The white channel only feeds
    /// [`Brightness::FromWhite`].
    pub order: ChannelOrder,
    pub brightness: Brightness,
}

impl Default for Apa102Config {
    fn default() -> Self {
        Self {
            order: ChannelOrder::BGR,
            brightness: Brightness::Global(31),
        }
    }
}

/// APA102 protocol driving a clocked transport
pub struct Apa102<T> {
    transport: T,
    config: Apa102Config,
    pixel_count: usize,
    frame: Vec<u8>,
}

impl Apa102Config {
    /// Use `order` for the color bytes, `None` unless it has three channels
    pub fn with_order(mut self, order: ChannelOrder) -> Option<Self> {
        if order.len() != CHANNELS_PER_PIXEL {
            return None;
        }
        self.order = order;
        Some(self)
    }
}

impl<T: Transport> Apa102<T> {
    /// Protocol owning its transport
    ///
    /// An order that is not three channels falls back to BGR.
    pub fn new(transport: T, pixel_count: usize, mut config: Apa102Config) -> Self {
        if config.order.len() != CHANNELS_PER_PIXEL {
            warn!(
                "APA102 takes 3 color channels, got {}, using BGR",
                config.order.len()
            );
            config.order = ChannelOrder::BGR;
        }
        Self {
            transport,
            config,
            pixel_count,
            frame: Vec::with_capacity(frame_bytes(pixel_count)),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &Apa102Config {
        &self.config
    }

    /// Change the brightness used by the next update
    pub fn set_brightness(&mut self, brightness: Brightness) {
        self.config.brightness = brightness;
    }

    fn brightness_of<C: PixelColor>(&self, color: &C) -> u8 {
        match self.config.brightness {
            Brightness::Global(level) => level.min(31),
            Brightness::FromWhite => color.channel8(WHITE) >> 3,
        }
    }
}

impl<'t, T: Transport> Apa102<&'t mut T> {
    pub fn borrowed(transport: &'t mut T, pixel_count: usize, config: Apa102Config) -> Self {
        Self::new(transport, pixel_count, config)
    }
}

/// Total frame length for `pixel_count` pixels
pub fn frame_bytes(pixel_count: usize) -> usize {
    START_FRAME.len() + pixel_count * 4 + 4 + pixel_count.div_ceil(16)
}

impl<T: Transport, C: PixelColor> Protocol<C> for Apa102<T> {
    fn initialize(&mut self) {
        self.transport.begin();
    }

    fn update(&mut self, colors: &[C]) {
        self.frame.clear();
        self.frame.extend_from_slice(&START_FRAME);
        for index in 0..self.pixel_count {
            let color = color_or_black(colors, index);
            let brightness = self.brightness_of(&color);
            self.frame.push(PIXEL_FLAG | brightness);
            for channel in self.config.order.channels() {
                self.frame.push(color.channel8(channel));
            }
        }
        let end = 4 + self.pixel_count.div_ceil(16);
        self.frame.resize(self.frame.len() + end, 0);

        self.transport.begin_transaction();
        self.transport.transmit_bytes(&self.frame);
        self.transport.end_transaction();
    }

    fn is_ready_to_update(&self) -> bool {
        self.transport.is_ready_to_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelwire_core::color::{Rgb8, Rgbw8};
    use smart_leds::White;

    #[derive(Default)]
    struct Capture {
        frames: Vec<Vec<u8>>,
    }

    impl Transport for Capture {
        fn begin(&mut self) {}

        fn begin_transaction(&mut self) {}

        fn transmit_bytes(&mut self, bytes: &[u8]) {
            self.frames.push(bytes.to_vec());
        }

        fn end_transaction(&mut self) {}
    }

    #[test]
    fn test_frame_layout() {
        let mut protocol = Apa102::new(Capture::default(), 2, Apa102Config::default());
        protocol.update(&[Rgb8::new(1, 2, 3), Rgb8::new(4, 5, 6)]);

        assert_eq!(
            protocol.transport().frames[0],
            [0, 0, 0, 0, 0xFF, 3, 2, 1, 0xFF, 6, 5, 4, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_end_frame_grows_every_16_pixels() {
        assert_eq!(frame_bytes(0), 8);
        assert_eq!(frame_bytes(16), 4 + 64 + 4 + 1);
        assert_eq!(frame_bytes(17), 4 + 68 + 4 + 2);
    }

    #[test]
    fn test_global_brightness_is_clamped() {
        let config = Apa102Config {
            order: ChannelOrder::RGB,
            brightness: Brightness::Global(200),
        };
        let mut protocol = Apa102::new(Capture::default(), 1, config);
        protocol.update(&[Rgb8::new(7, 8, 9)]);
        assert_eq!(&protocol.transport().frames[0][4..8], &[0xFF, 7, 8, 9]);

        protocol.set_brightness(Brightness::Global(3));
        protocol.update(&[Rgb8::new(7, 8, 9)]);
        assert_eq!(protocol.transport().frames[1][4], 0xE3);
    }

    #[test]
    fn test_four_channel_order_is_rejected() {
        assert!(Apa102Config::default()
            .with_order(ChannelOrder::GRBW)
            .is_none());
        let config = Apa102Config::default()
            .with_order(ChannelOrder::GRB)
            .unwrap();
        assert_eq!(config.order, ChannelOrder::GRB);

        let forced = Apa102Config {
            order: ChannelOrder::GRBW,
            brightness: Brightness::Global(31),
        };
        let mut protocol = Apa102::new(Capture::default(), 1, forced);
        assert_eq!(protocol.config().order, ChannelOrder::BGR);

        let color = Rgbw8 {
            r: 1,
            g: 2,
            b: 3,
            a: White(4),
        };
        protocol.update(&[color]);
        assert_eq!(protocol.transport().frames[0].len(), frame_bytes(1));
        assert_eq!(&protocol.transport().frames[0][4..8], &[0xFF, 3, 2, 1]);
    }

    #[test]
    fn test_brightness_from_white() {
        let config = Apa102Config {
            order: ChannelOrder::BGR,
            brightness: Brightness::FromWhite,
        };
        let mut protocol = Apa102::new(Capture::default(), 1, config);
        let color = Rgbw8 {
            r: 10,
            g: 20,
            b: 30,
            a: White(0x88),
        };
        protocol.update(&[color]);

        assert_eq!(&protocol.transport().frames[0][4..8], &[0xE0 | 0x11, 30, 20, 10]);
    }
}
