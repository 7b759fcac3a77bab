//! Pixel color types
//!
//! Protocols see colors only through [`PixelColor`]: a fixed number of
//! channels at a fixed depth, addressed by canonical index (red, green,
//! blue, then white or cool/warm white). [`ChannelOrder`] maps canonical
//! channels to wire positions.

use smart_leds::{White, RGB, RGBW};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 8-bit RGB
pub type Rgb8 = RGB<u8>;

/// 16-bit RGB
pub type Rgb16 = RGB<u16>;

/// 8-bit RGB plus a white channel
pub type Rgbw8 = RGBW<u8>;

/// Native bit depth of a color's channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelDepth {
    /// 8 bits per channel
    Eight,
    /// 16 bits per channel
    Sixteen,
}

impl ChannelDepth {
    /// Number of bits per channel
    pub const fn bits(self) -> u8 {
        match self {
            ChannelDepth::Eight => 8,
            ChannelDepth::Sixteen => 16,
        }
    }
}

/// A color stored in a pixel buffer
pub trait PixelColor: Copy + PartialEq {
    /// Number of channels
    const CHANNELS: usize;

    /// Native channel depth
    const DEPTH: ChannelDepth;

    /// The zero color (all channels off)
    fn black() -> Self;

    /// Raw channel value at native depth, or 0 if the channel doesn't exist
    fn channel(&self, index: usize) -> u16;

    /// Channel value scaled to 8 bits
    fn channel8(&self, index: usize) -> u8 {
        self.channel_bits(index, 8) as u8
    }

    /// Channel value scaled to 16 bits
    fn channel16(&self, index: usize) -> u16 {
        self.channel_bits(index, 16)
    }

    /// Channel value scaled to `bits` (1..=16) bits
    ///
    /// Narrowing drops low bits. Widening replicates the high bits into the
    /// new low bits so full scale stays full scale.
    fn channel_bits(&self, index: usize, bits: u8) -> u16 {
        let depth = Self::DEPTH.bits();
        let value = self.channel(index);
        if bits <= depth {
            value >> (depth - bits)
        } else {
            let widened = u32::from(value) << (bits - depth);
            let fill = u32::from(value) >> (2 * depth).saturating_sub(bits);
            (widened | fill) as u16
        }
    }
}

impl PixelColor for Rgb8 {
    const CHANNELS: usize = 3;
    const DEPTH: ChannelDepth = ChannelDepth::Eight;

    fn black() -> Self {
        RGB::new(0, 0, 0)
    }

    fn channel(&self, index: usize) -> u16 {
        match index {
            0 => u16::from(self.r),
            1 => u16::from(self.g),
            2 => u16::from(self.b),
            _ => 0,
        }
    }
}

impl PixelColor for Rgb16 {
    const CHANNELS: usize = 3;
    const DEPTH: ChannelDepth = ChannelDepth::Sixteen;

    fn black() -> Self {
        RGB::new(0, 0, 0)
    }

    fn channel(&self, index: usize) -> u16 {
        match index {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            _ => 0,
        }
    }
}

impl PixelColor for Rgbw8 {
    const CHANNELS: usize = 4;
    const DEPTH: ChannelDepth = ChannelDepth::Eight;

    fn black() -> Self {
        RGBW {
            r: 0,
            g: 0,
            b: 0,
            a: White(0),
        }
    }

    fn channel(&self, index: usize) -> u16 {
        match index {
            0 => u16::from(self.r),
            1 => u16::from(self.g),
            2 => u16::from(self.b),
            3 => u16::from(self.a.0),
            _ => 0,
        }
    }
}

/// 16-bit RGB plus cool white and warm white channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgbcw16 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    /// Cool white
    pub c: u16,
    /// Warm white
    pub w: u16,
}

impl Rgbcw16 {
    pub const fn new(r: u16, g: u16, b: u16, c: u16, w: u16) -> Self {
        Self { r, g, b, c, w }
    }
}

impl PixelColor for Rgbcw16 {
    const CHANNELS: usize = 5;
    const DEPTH: ChannelDepth = ChannelDepth::Sixteen;

    fn black() -> Self {
        Self::default()
    }

    fn channel(&self, index: usize) -> u16 {
        match index {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            3 => self.c,
            4 => self.w,
            _ => 0,
        }
    }
}

/// Maximum channels any supported chip puts on the wire per pixel
pub const MAX_WIRE_CHANNELS: usize = 5;

/// Wire order of a pixel's channels
///
/// Position `i` on the wire carries canonical channel `positions[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelOrder {
    positions: [u8; MAX_WIRE_CHANNELS],
    len: u8,
}

impl ChannelOrder {
    pub const RGB: Self = Self::three(0, 1, 2);
    pub const RBG: Self = Self::three(0, 2, 1);
    pub const GRB: Self = Self::three(1, 0, 2);
    pub const GBR: Self = Self::three(1, 2, 0);
    pub const BRG: Self = Self::three(2, 0, 1);
    pub const BGR: Self = Self::three(2, 1, 0);
    pub const RGBW: Self = Self::four(0, 1, 2, 3);
    pub const GRBW: Self = Self::four(1, 0, 2, 3);
    pub const WRGB: Self = Self::four(3, 0, 1, 2);
    pub const RGBCW: Self = Self {
        positions: [0, 1, 2, 3, 4],
        len: 5,
    };
    pub const GRBCW: Self = Self {
        positions: [1, 0, 2, 3, 4],
        len: 5,
    };

    const fn three(a: u8, b: u8, c: u8) -> Self {
        Self {
            positions: [a, b, c, 0, 0],
            len: 3,
        }
    }

    const fn four(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self {
            positions: [a, b, c, d, 0],
            len: 4,
        }
    }

    /// Number of channels on the wire per pixel
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Canonical channel index for each wire position, in wire order
    pub fn channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions[..self.len()].iter().map(|&p| p as usize)
    }
}

/// Bytes per channel on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WireDepth {
    /// One byte per channel
    Eight,
    /// Two bytes per channel, big-endian
    Sixteen,
}

impl WireDepth {
    /// Bytes per channel
    pub const fn bytes(self) -> usize {
        match self {
            WireDepth::Eight => 1,
            WireDepth::Sixteen => 2,
        }
    }

    /// Append `color`'s channels in `order` at this depth
    pub fn push_pixel<C: PixelColor>(
        self,
        color: &C,
        order: &ChannelOrder,
        out: &mut alloc::vec::Vec<u8>,
    ) {
        for channel in order.channels() {
            match self {
                WireDepth::Eight => out.push(color.channel8(channel)),
                WireDepth::Sixteen => out.extend_from_slice(&color.channel16(channel).to_be_bytes()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_depth_conversion() {
        let color = Rgb8::new(0xFF, 0x80, 0x01);
        assert_eq!(color.channel16(0), 0xFFFF);
        assert_eq!(color.channel16(1), 0x8080);
        assert_eq!(color.channel_bits(2, 12), 0x010);
        assert_eq!(color.channel_bits(0, 12), 0xFFF);

        let wide = Rgb16::new(0xABCD, 0x00FF, 0);
        assert_eq!(wide.channel8(0), 0xAB);
        assert_eq!(wide.channel8(1), 0x00);
        assert_eq!(wide.channel_bits(0, 12), 0xABC);
    }

    #[test]
    fn test_missing_channel_is_zero() {
        let color = Rgb8::new(1, 2, 3);
        assert_eq!(color.channel(3), 0);
        assert_eq!(color.channel8(4), 0);
    }

    #[test]
    fn test_white_channel() {
        let color = Rgbw8 {
            r: 1,
            g: 2,
            b: 3,
            a: White(4),
        };
        assert_eq!(color.channel8(3), 4);
    }

    #[test]
    fn test_channel_order_push() {
        let mut out = Vec::new();
        WireDepth::Eight.push_pixel(&Rgb8::new(1, 2, 3), &ChannelOrder::GRB, &mut out);
        assert_eq!(out, [2, 1, 3]);

        out.clear();
        WireDepth::Sixteen.push_pixel(&Rgbcw16::new(1, 2, 3, 4, 5), &ChannelOrder::GRBCW, &mut out);
        assert_eq!(out, [0, 2, 0, 1, 0, 3, 0, 4, 0, 5]);
    }

    #[test]
    fn test_wrgb_order() {
        let channels: Vec<usize> = ChannelOrder::WRGB.channels().collect();
        assert_eq!(channels, [3, 0, 1, 2]);
    }
}
