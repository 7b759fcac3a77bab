//! One-wire chip protocol (WS2812, WS2811, SK6812, TM1814 and clones)
//!
//! The frame is an optional fixed prefix followed by every pixel's channels
//! in wire order. Bit timing and the latch interval belong to the
//! transport (self-clocking or DMA with a bit pattern).

use alloc::vec::Vec;

use heapless::Vec as BoundedVec;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use pixelwire_core::color::{ChannelOrder, PixelColor, WireDepth};
use pixelwire_core::protocol::{color_or_black, Protocol};
use pixelwire_hal::Transport;

/// Maximum length of a frame prefix
pub const MAX_PREFIX: usize = 16;

/// One-wire frame layout
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OneWireConfig {
    /// Channel order on the wire
    pub order: ChannelOrder,
    /// Bytes per channel
    pub depth: WireDepth,
    /// Bytes sent before the first pixel
    pub prefix: BoundedVec<u8, MAX_PREFIX>,
}

impl OneWireConfig {
    pub fn new(order: ChannelOrder, depth: WireDepth) -> Self {
        Self {
            order,
            depth,
            prefix: BoundedVec::new(),
        }
    }

    /// WS2812B and most RGB clones
    pub fn ws2812() -> Self {
        Self::new(ChannelOrder::GRB, WireDepth::Eight)
    }

    /// WS2811 driver ICs
    pub fn ws2811() -> Self {
        Self::new(ChannelOrder::RGB, WireDepth::Eight)
    }

    /// SK6812 RGBW
    pub fn sk6812_rgbw() -> Self {
        Self::new(ChannelOrder::GRBW, WireDepth::Eight)
    }

    /// TM1814 with its per-channel constant-current setting
    ///
    /// The chip expects the four current bytes followed by their
    /// complement ahead of the pixels.
    pub fn tm1814(current: [u8; 4]) -> Self {
        let mut config = Self::new(ChannelOrder::WRGB, WireDepth::Eight);
        for byte in current.iter().chain(current.map(|c| !c).iter()) {
            // 8 bytes always fit
            let _ = config.prefix.push(*byte);
        }
        config
    }

    /// Set the frame prefix, `None` if it exceeds [`MAX_PREFIX`] bytes
    pub fn with_prefix(mut self, prefix: &[u8]) -> Option<Self> {
        self.prefix = BoundedVec::from_slice(prefix).ok()?;
        Some(self)
    }

    /// Bytes one pixel occupies on the wire
    pub fn pixel_bytes(&self) -> usize {
        self.order.len() * self.depth.bytes()
    }

    /// Bytes of a whole frame of `pixel_count` pixels
    pub fn frame_bytes(&self, pixel_count: usize) -> usize {
        self.prefix.len() + pixel_count * self.pixel_bytes()
    }
}

/// One-wire protocol driving a transport
pub struct OneWire<T> {
    transport: T,
    config: OneWireConfig,
    pixel_count: usize,
    frame: Vec<u8>,
}

impl<T: Transport> OneWire<T> {
    /// Protocol owning its transport
    pub fn new(transport: T, pixel_count: usize, config: OneWireConfig) -> Self {
        let frame = Vec::with_capacity(config.frame_bytes(pixel_count));
        Self {
            transport,
            config,
            pixel_count,
            frame,
        }
    }

    pub fn config(&self) -> &OneWireConfig {
        &self.config
    }

    /// Length of every frame handed to the transport
    pub fn frame_bytes(&self) -> usize {
        self.config.frame_bytes(self.pixel_count)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<'t, T: Transport> OneWire<&'t mut T> {
    /// Protocol driving a transport owned by the caller
    pub fn borrowed(transport: &'t mut T, pixel_count: usize, config: OneWireConfig) -> Self {
        Self::new(transport, pixel_count, config)
    }
}

impl<T: Transport, C: PixelColor> Protocol<C> for OneWire<T> {
    fn initialize(&mut self) {
        self.transport.begin();
    }

    fn update(&mut self, colors: &[C]) {
        self.frame.clear();
        self.frame.extend_from_slice(&self.config.prefix);
        for index in 0..self.pixel_count {
            let color = color_or_black(colors, index);
            self.config
                .depth
                .push_pixel(&color, &self.config.order, &mut self.frame);
        }

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
    use crate::transport::DebugTransport;
    use alloc::string::String;
    use pixelwire_core::color::{Rgb8, Rgbcw16, Rgbw8};
    use smart_leds::White;

    #[derive(Default)]
    struct Capture {
        frames: Vec<Vec<u8>>,
        begun: bool,
    }

    impl Transport for Capture {
        fn begin(&mut self) {
            self.begun = true;
        }

        fn begin_transaction(&mut self) {}

        fn transmit_bytes(&mut self, bytes: &[u8]) {
            self.frames.push(bytes.to_vec());
        }

        fn end_transaction(&mut self) {}
    }

    #[test]
    fn test_grb_frame() {
        let mut protocol = OneWire::new(Capture::default(), 2, OneWireConfig::ws2812());
        Protocol::<Rgb8>::initialize(&mut protocol);
        protocol.update(&[Rgb8::new(1, 2, 3), Rgb8::new(4, 5, 6)]);

        assert!(protocol.transport().begun);
        assert_eq!(protocol.transport().frames[0], [2, 1, 3, 5, 4, 6]);
    }

    #[test]
    fn test_missing_pixels_are_black_and_extra_ignored() {
        let mut protocol = OneWire::new(Capture::default(), 2, OneWireConfig::ws2811());
        protocol.update(&[Rgb8::new(9, 9, 9)]);
        protocol.update(&[Rgb8::new(1, 1, 1), Rgb8::new(2, 2, 2), Rgb8::new(3, 3, 3)]);

        let frames = &protocol.transport().frames;
        assert_eq!(frames[0], [9, 9, 9, 0, 0, 0]);
        assert_eq!(frames[1], [1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_sixteen_bit_rgbcw() {
        let config = OneWireConfig::new(ChannelOrder::RGBCW, WireDepth::Sixteen);
        let mut protocol = OneWire::new(Capture::default(), 1, config);
        assert_eq!(protocol.frame_bytes(), 10);

        protocol.update(&[Rgbcw16::new(0x0102, 0x0304, 0x0506, 0x0708, 0x090A)]);
        assert_eq!(
            protocol.transport().frames[0],
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
        );
    }

    #[test]
    fn test_tm1814_prefix() {
        let mut protocol = OneWire::new(
            Capture::default(),
            1,
            OneWireConfig::tm1814([0x10, 0x20, 0x30, 0x40]),
        );
        let color = Rgbw8 {
            r: 1,
            g: 2,
            b: 3,
            a: White(4),
        };
        protocol.update(&[color]);

        assert_eq!(
            protocol.transport().frames[0],
            [0x10, 0x20, 0x30, 0x40, 0xEF, 0xDF, 0xCF, 0xBF, 4, 1, 2, 3]
        );
    }

    #[test]
    fn test_prefix_limit() {
        assert!(OneWireConfig::ws2812().with_prefix(&[0; 16]).is_some());
        assert!(OneWireConfig::ws2812().with_prefix(&[0; 17]).is_none());
    }

    #[test]
    fn test_borrowed_transport_over_debug_sink() {
        let mut sink = DebugTransport::new(String::new());
        {
            let mut protocol = OneWire::borrowed(&mut sink, 1, OneWireConfig::ws2812());
            Protocol::<Rgb8>::initialize(&mut protocol);
            protocol.update(&[Rgb8::new(0x10, 0x20, 0x30)]);
        }
        assert_eq!(
            sink.output(),
            "begin\nbeginTransaction\ntransmit 20 10 30\nendTransaction\n"
        );
    }
}
