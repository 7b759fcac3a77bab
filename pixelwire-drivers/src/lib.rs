//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in pixelwire-core and pixelwire-hal:
//!
//! - Protocols (one-wire timed chips, APA102, WS2801, LPD8806, P9813, TLC5947)
//! - Clocked transports (bit-banged GPIO, SPI)
//! - Self-clocking encoding over a clocked transport
//! - DMA transport with completion tracking
//! - Debug transport tracing every bus operation

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod protocol;
pub mod transport;
