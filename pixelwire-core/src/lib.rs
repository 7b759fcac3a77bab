//! Board-agnostic core logic for pixelwire
//!
//! This crate contains all LED pipeline logic that does not depend on
//! specific hardware implementations:
//!
//! - Color types and wire channel order
//! - Shader and protocol contracts
//! - Pixel bus with dirty tracking
//! - Self-clocking bit encoding
//! - DMA completion tracking and interrupt dispatch
//! - Lane multiplexing over a shared parallel peripheral

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod bus;
pub mod color;
pub mod completion;
pub mod encoding;
pub mod mux;
pub mod protocol;
pub mod shader;

pub use bus::PixelBus;
pub use color::{ChannelOrder, PixelColor, Rgb16, Rgb8, Rgbcw16, Rgbw8, WireDepth};
pub use completion::{CompletionDispatch, CompletionState, CompletionTracker, DispatchError};
pub use encoding::{BitPattern, OneWireTiming, PatternError};
pub use mux::{LaneError, LaneId, LaneMux, LaneMuxSet, MuxConfig, MuxLane, PeripheralId};
pub use protocol::Protocol;
pub use shader::{NoShader, Shader, ShaderMode};
