//! WS2801 clocked protocol
//!
//! Plain 8-bit channels, no start or end frame. The chip latches after the
//! clock has been idle for 500 µs, so the protocol is not ready again
//! until that interval has passed.

use alloc::vec::Vec;

use pixelwire_core::color::{ChannelOrder, PixelColor};
use pixelwire_core::protocol::{color_or_black, Protocol};
use pixelwire_hal::{MicrosClock, Transport};

/// Idle time that latches a frame (µs)
pub const LATCH_US: u32 = 500;

/// WS2801 protocol driving a clocked transport
pub struct Ws2801<T, K> {
    transport: T,
    clock: K,
    order: ChannelOrder,
    pixel_count: usize,
    frame: Vec<u8>,
    last_update_us: Option<u32>,
}

impl<T: Transport, K: MicrosClock> Ws2801<T, K> {
    /// RGB order
    pub fn new(transport: T, pixel_count: usize, clock: K) -> Self {
        Self::with_order(transport, pixel_count, clock, ChannelOrder::RGB)
    }

    pub fn with_order(transport: T, pixel_count: usize, clock: K, order: ChannelOrder) -> Self {
        Self {
            transport,
            clock,
            order,
            pixel_count,
            frame: Vec::with_capacity(pixel_count * order.len()),
            last_update_us: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<'t, T: Transport, K: MicrosClock> Ws2801<&'t mut T, K> {
    pub fn borrowed(transport: &'t mut T, pixel_count: usize, clock: K) -> Self {
        Self::new(transport, pixel_count, clock)
    }
}

impl<T: Transport, K: MicrosClock, C: PixelColor> Protocol<C> for Ws2801<T, K> {
    fn initialize(&mut self) {
        self.transport.begin();
    }

    fn update(&mut self, colors: &[C]) {
        self.frame.clear();
        for index in 0..self.pixel_count {
            let color = color_or_black(colors, index);
            self.frame
                .extend(self.order.channels().map(|channel| color.channel8(channel)));
        }

        self.transport.begin_transaction();
        self.transport.transmit_bytes(&self.frame);
        self.transport.end_transaction();
        self.last_update_us = Some(self.clock.now_us());
    }

    fn is_ready_to_update(&self) -> bool {
        let latched = match self.last_update_us {
            Some(at) => self.clock.elapsed_since(at) >= LATCH_US,
            None => true,
        };
        latched && self.transport.is_ready_to_update()
    }
}
