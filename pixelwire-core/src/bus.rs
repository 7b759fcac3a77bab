//! Pixel bus: the frame pipeline
//!
//! The bus owns the pixel buffer and a protocol and tracks whether the
//! buffer changed since the last frame.
//!
//! # Show cycle
//!
//! ```text
//! set_pixel_color ──► dirty = true
//! show ──► (dirty || always_update)? ──► shader chain ──► Protocol::update
//!                                                          │
//!                                              dirty = false
//! ```
//!
//! `show()` never waits for hardware. [`PixelBus::can_show`] reports the
//! protocol's readiness; callers that cannot tolerate a dropped or torn
//! frame check it before showing.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use smart_leds::SmartLedsWrite;

use crate::color::PixelColor;
use crate::protocol::Protocol;
use crate::shader::{NoShader, Shader, ShaderMode};

/// Pixel buffer with dirty tracking, bound to one protocol
pub struct PixelBus<C, P, S = NoShader> {
    pixels: Vec<C>,
    /// Private shading buffer, present only in [`ShaderMode::Copy`]
    scratch: Option<Vec<C>>,
    protocol: P,
    shader: S,
    dirty: bool,
}

impl<C: PixelColor, P: Protocol<C>> PixelBus<C, P, NoShader> {
    /// Create a bus of `pixel_count` black pixels without shaders
    pub fn new(pixel_count: usize, protocol: P) -> Self {
        Self {
            pixels: vec![C::black(); pixel_count],
            scratch: None,
            protocol,
            shader: NoShader,
            dirty: false,
        }
    }
}

impl<C: PixelColor, P: Protocol<C>, S: Shader<C>> PixelBus<C, P, S> {
    /// Create a bus that runs `shader` on every frame
    ///
    /// In [`ShaderMode::Copy`] the scratch buffer is allocated here, once.
    pub fn with_shader(pixel_count: usize, protocol: P, shader: S, mode: ShaderMode) -> Self {
        let scratch = match mode {
            ShaderMode::Copy => Some(vec![C::black(); pixel_count]),
            ShaderMode::InPlace => None,
        };
        Self {
            pixels: vec![C::black(); pixel_count],
            scratch,
            protocol,
            shader,
            dirty: false,
        }
    }

    /// Bring up the protocol and its transport
    pub fn begin(&mut self) {
        self.protocol.initialize();
    }

    /// Send the buffer if it changed or the chip needs constant refresh
    ///
    /// The dirty flag is cleared whether or not the transport actually
    /// took the frame.
    pub fn show(&mut self) {
        if !self.dirty && !self.protocol.always_update() {
            return;
        }

        match self.scratch.as_mut() {
            Some(scratch) => {
                scratch.copy_from_slice(&self.pixels);
                self.shader.apply(scratch);
                self.protocol.update(scratch);
            }
            None => {
                self.shader.apply(&mut self.pixels);
                self.protocol.update(&self.pixels);
            }
        }

        self.dirty = false;
    }

    /// Check whether the protocol can take a frame now (advisory)
    pub fn can_show(&self) -> bool {
        self.protocol.is_ready_to_update()
    }

    /// Store `color` at `index` and mark the buffer dirty
    ///
    /// Out-of-range indices are ignored.
    pub fn set_pixel_color(&mut self, index: usize, color: C) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
            self.dirty = true;
        }
    }

    /// Stored color at `index`, black if out of range
    pub fn get_pixel_color(&self, index: usize) -> C {
        self.pixels.get(index).copied().unwrap_or_else(C::black)
    }

    /// Exchange two pixels
    pub fn swap_pixel_color(&mut self, a: usize, b: usize) {
        if a < self.pixels.len() && b < self.pixels.len() {
            self.pixels.swap(a, b);
            self.dirty = true;
        }
    }

    /// Fill the whole buffer with `color`
    pub fn clear_to(&mut self, color: C) {
        self.pixels.fill(color);
        self.dirty = true;
    }

    /// Fill `first..=last` with `color`, clipped to the buffer
    pub fn clear_range(&mut self, color: C, first: usize, last: usize) {
        if first >= self.pixels.len() || first > last {
            return;
        }
        let end = last.min(self.pixels.len() - 1);
        self.pixels[first..=end].fill(color);
        self.dirty = true;
    }

    /// Rotate the buffer towards index 0
    pub fn rotate_left(&mut self, count: usize) {
        if self.pixels.is_empty() {
            return;
        }
        let count = count % self.pixels.len();
        self.pixels.rotate_left(count);
        self.dirty = true;
    }

    /// Rotate the buffer away from index 0
    pub fn rotate_right(&mut self, count: usize) {
        if self.pixels.is_empty() {
            return;
        }
        let count = count % self.pixels.len();
        self.pixels.rotate_right(count);
        self.dirty = true;
    }

    /// Shift the buffer towards index 0, filling the tail with black
    pub fn shift_left(&mut self, count: usize) {
        let len = self.pixels.len();
        let count = count.min(len);
        self.pixels.copy_within(count.., 0);
        self.pixels[len - count..].fill(C::black());
        self.dirty = true;
    }

    /// Shift the buffer away from index 0, filling the head with black
    pub fn shift_right(&mut self, count: usize) {
        let len = self.pixels.len();
        let count = count.min(len);
        self.pixels.copy_within(..len - count, count);
        self.pixels[..count].fill(C::black());
        self.dirty = true;
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Read-only view of the stored pixels
    pub fn pixels(&self) -> &[C] {
        &self.pixels
    }

    /// Check whether the buffer has unsent writes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the next `show()` to send
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Drop pending writes from the next `show()`
    pub fn reset_dirty(&mut self) {
        self.dirty = false;
    }

    /// The bus protocol
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Mutable access to the bus protocol
    pub fn protocol_mut(&mut self) -> &mut P {
        &mut self.protocol
    }
}

impl<C: PixelColor, P: Protocol<C>, S: Shader<C>> SmartLedsWrite for PixelBus<C, P, S> {
    type Error = Infallible;
    type Color = C;

    /// Overwrite the buffer from index 0 and show it
    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        for (index, color) in iterator.into_iter().take(self.pixels.len()).enumerate() {
            self.set_pixel_color(index, color.into());
        }
        self.show();
        Ok(())
    }
}
