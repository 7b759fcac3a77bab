//! Protocol contract
//!
//! A protocol knows one chip's framing. It owns or borrows a
//! [`Transport`](pixelwire_hal::Transport) and turns a color buffer into
//! transport calls.

use crate::color::PixelColor;

/// Chip wire protocol
pub trait Protocol<C: PixelColor> {
    /// One-time transport and chip bring-up
    fn initialize(&mut self);

    /// Encode `colors` and hand the frame to the transport
    ///
    /// Colors beyond the protocol's pixel count are ignored and missing
    /// colors are sent as black.
    fn update(&mut self, colors: &[C]);

    /// Check whether the hardware can take the next frame
    fn is_ready_to_update(&self) -> bool;

    /// Check whether the chip must be refreshed every cycle
    ///
    /// Chips whose outputs decay without a periodic refresh return true,
    /// making the bus send a frame on every `show()` even when clean.
    fn always_update(&self) -> bool {
        false
    }
}

/// Color at `index`, black when `colors` is shorter than the frame
pub fn color_or_black<C: PixelColor>(colors: &[C], index: usize) -> C {
    colors.get(index).copied().unwrap_or_else(C::black)
}
