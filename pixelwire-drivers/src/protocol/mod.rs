//! Chip wire formats
//!
//! - [`OneWire`] - WS2812 family, SK6812, TM1814 and other timed chips
//! - [`Apa102`] - APA102 / SK9822 with per-pixel brightness
//! - [`Ws2801`] - Plain 8-bit channels with idle latch
//! - [`Lpd8806`] - 7-bit channels with zero-byte latch
//! - [`P9813`] - Flag byte checksum per pixel
//! - [`Tlc5947`] - 12-bit PWM shift registers with latch pin

pub mod apa102;
pub mod lpd8806;
pub mod one_wire;
pub mod p9813;
pub mod tlc5947;
pub mod ws2801;

pub use apa102::{Apa102, Apa102Config, Brightness};
pub use lpd8806::Lpd8806;
pub use one_wire::{OneWire, OneWireConfig};
pub use p9813::P9813;
pub use tlc5947::{Tlc5947, Tlc5947Config};
pub use ws2801::Ws2801;
