//! LPD8806 clocked protocol
//!
//! 7-bit channels with the top bit set, GRB order. A run of zero bytes
//! (one per 32 pixels) resets the chain's latch.

use alloc::vec::Vec;

use pixelwire_core::color::{ChannelOrder, PixelColor};
use pixelwire_core::protocol::{color_or_black, Protocol};
use pixelwire_hal::Transport;

/// LPD8806 protocol driving a clocked transport
pub struct Lpd8806<T> {
    transport: T,
    order: ChannelOrder,
    pixel_count: usize,
    frame: Vec<u8>,
}

impl<T: Transport> Lpd8806<T> {
    pub fn new(transport: T, pixel_count: usize) -> Self {
        let order = ChannelOrder::GRB;
        Self {
            transport,
            order,
            pixel_count,
            frame: Vec::with_capacity(pixel_count * order.len() + latch_bytes(pixel_count)),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<'t, T: Transport> Lpd8806<&'t mut T> {
    pub fn borrowed(transport: &'t mut T, pixel_count: usize) -> Self {
        Self::new(transport, pixel_count)
    }
}

/// Zero bytes closing a frame of `pixel_count` pixels
pub fn latch_bytes(pixel_count: usize) -> usize {
    pixel_count.div_ceil(32)
}

impl<T: Transport, C: PixelColor> Protocol<C> for Lpd8806<T> {
    fn initialize(&mut self) {
        self.transport.begin();
    }

    fn update(&mut self, colors: &[C]) {
        self.frame.clear();
        for index in 0..self.pixel_count {
            let color = color_or_black(colors, index);
            self.frame.extend(
                self.order
                    .channels()
                    .map(|channel| 0x80 | (color.channel8(channel) >> 1)),
            );
        }
        self.frame
            .resize(self.frame.len() + latch_bytes(self.pixel_count), 0);

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
    use pixelwire_core::color::Rgb8;

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
    fn test_seven_bit_grb_with_latch() {
        let mut protocol = Lpd8806::new(Capture::default(), 2);
        protocol.update(&[Rgb8::new(0xFF, 0x02, 0x80)]);

        assert_eq!(
            protocol.transport().frames[0],
            [0x81, 0xFF, 0xC0, 0x80, 0x80, 0x80, 0x00]
        );
    }

    #[test]
    fn test_latch_length() {
        assert_eq!(latch_bytes(0), 0);
        assert_eq!(latch_bytes(32), 1);
        assert_eq!(latch_bytes(33), 2);
    }
}
