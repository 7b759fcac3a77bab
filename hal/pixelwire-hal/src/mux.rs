//! Parallel-output peripheral shared by multiplexed lanes
//!
//! Peripherals like a parallel I2S engine clock out one sample word per
//! transport bit, with every bit of the word driving a separate pin. Each
//! pin carries one logical LED string (a lane).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of lanes carried by one hardware sample word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LaneWidth {
    /// 8 lanes, one byte per sample
    Eight,
    /// 16 lanes, two bytes per sample (little-endian)
    Sixteen,
}

impl LaneWidth {
    /// Maximum number of lanes
    pub const fn lanes(self) -> u8 {
        match self {
            LaneWidth::Eight => 8,
            LaneWidth::Sixteen => 16,
        }
    }

    /// Bytes per sample word
    pub const fn sample_bytes(self) -> usize {
        match self {
            LaneWidth::Eight => 1,
            LaneWidth::Sixteen => 2,
        }
    }
}

/// Shared parallel-output DMA peripheral
pub trait MuxPeripheral {
    /// Error type for peripheral driver calls
    type Error;

    /// Bring up the peripheral and its pins
    fn init(&mut self, width: LaneWidth) -> Result<(), Self::Error>;

    /// Queue a transfer of the interleaved sample buffer
    fn start(&mut self, samples: &[u8]) -> Result<(), Self::Error>;

    /// Stop the peripheral, free its DMA resources and release the pins
    fn deinit(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_width() {
        assert_eq!(LaneWidth::Eight.lanes(), 8);
        assert_eq!(LaneWidth::Sixteen.lanes(), 16);
        assert_eq!(LaneWidth::Sixteen.sample_bytes(), 2);
    }
}
