//! Transport implementations
//!
//! - [`BitBangTransport`] - Clock/data over two GPIO pins
//! - [`SpiTransport`] - Clock/data over an `embedded-hal` SPI bus
//! - [`DebugTransport`] - Textual trace of every bus operation
//! - [`SelfClockingTransport`] - One-wire timing on a clocked data line
//! - [`DmaTransport`] - Non-blocking transfers with completion tracking

mod bitbang;
mod debug;
mod dma;
mod self_clocking;
mod spi;

pub use bitbang::BitBangTransport;
pub use debug::{DebugTransport, NullTransport};
pub use dma::{DmaConfig, DmaTransport};
pub use self_clocking::SelfClockingTransport;
pub use spi::SpiTransport;
