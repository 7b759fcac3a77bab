//! P9813 clocked protocol
//!
//! Every pixel is preceded by a flag byte carrying the inverted top two
//! bits of each channel as a checksum:
//!
//! ```text
//! 1 1 ~B7 ~B6 ~G7 ~G6 ~R7 ~R6   B   G   R
//! ```
//!
//! The frame is bracketed by four zero bytes on each side.

use alloc::vec::Vec;

use pixelwire_core::color::PixelColor;
use pixelwire_core::protocol::{color_or_black, Protocol};
use pixelwire_hal::Transport;

const BOUNDARY: [u8; 4] = [0; 4];

/// P9813 protocol driving a clocked transport
pub struct P9813<T> {
    transport: T,
    pixel_count: usize,
    frame: Vec<u8>,
}

impl<T: Transport> P9813<T> {
    pub fn new(transport: T, pixel_count: usize) -> Self {
        Self {
            transport,
            pixel_count,
            frame: Vec::with_capacity(2 * BOUNDARY.len() + pixel_count * 4),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<'t, T: Transport> P9813<&'t mut T> {
    pub fn borrowed(transport: &'t mut T, pixel_count: usize) -> Self {
        Self::new(transport, pixel_count)
    }
}

/// Flag byte for one pixel
pub fn flag(r: u8, g: u8, b: u8) -> u8 {
    let top = |v: u8| (!v >> 6) & 0b11;
    0xC0 | (top(b) << 4) | (top(g) << 2) | top(r)
}

impl<T: Transport, C: PixelColor> Protocol<C> for P9813<T> {
    fn initialize(&mut self) {
        self.transport.begin();
    }

    fn update(&mut self, colors: &[C]) {
        self.frame.clear();
        self.frame.extend_from_slice(&BOUNDARY);
        for index in 0..self.pixel_count {
            let color = color_or_black(colors, index);
            let (r, g, b) = (color.channel8(0), color.channel8(1), color.channel8(2));
            self.frame.extend_from_slice(&[flag(r, g, b), b, g, r]);
        }
        self.frame.extend_from_slice(&BOUNDARY);

        self.transport.begin_transaction();
        self.transport.transmit_bytes(&self.frame);
        self.transport.end_transaction();
    }

    fn is_ready_to_update(&self) -> bool {
        self.transport.is_ready_to_update()
    }
}
