//! pixelwire Hardware Abstraction Layer
//!
//! This crate defines the traits that sit between LED chip protocols and
//! the hardware that moves their bytes. Chip-specific HALs implement the
//! hardware seams; `pixelwire-drivers` implements [`Transport`] on top of
//! them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  PixelBus / Protocol (pixelwire-core)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  Transport (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────┐
//!         ▼           ▼           ▼
//!   ┌──────────┐ ┌──────────┐ ┌──────────┐
//!   │  GPIO /  │ │   DMA    │ │  Lane    │
//!   │   SPI    │ │ channel  │ │   mux    │
//!   └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! # Traits
//!
//! - [`transport::Transport`] - The byte sink every protocol writes to
//! - [`gpio::OutputPin`] - Digital output for bit-banged transports and latches
//! - [`clock::MicrosClock`] - Microsecond timestamps for latch/reset intervals
//! - [`dma::DmaChannel`], [`dma::ChannelStatus`], [`dma::InterruptLine`] -
//!   DMA transfers and their shared completion interrupt
//! - [`mux::MuxPeripheral`] - Parallel-output DMA engine shared by lanes

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod dma;
pub mod gpio;
pub mod mux;
pub mod spi;
pub mod transport;

// Re-export key traits at crate root for convenience
pub use clock::MicrosClock;
pub use dma::{ChannelStatus, DmaChannel, InterruptLine};
pub use gpio::OutputPin;
pub use mux::{LaneWidth, MuxPeripheral};
pub use spi::{BitOrder, ClockConfig, Mode};
pub use transport::Transport;
