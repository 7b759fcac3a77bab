//! Clocked-line configuration
//!
//! Clock rate, polarity/phase and bit order applied by clocked transports
//! at the start of every frame.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clocked transport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockConfig {
    /// Clock frequency in Hz
    pub frequency_hz: u32,
    /// Clock polarity and phase
    pub mode: Mode,
    /// Order in which the bits of each byte leave the data line
    pub bit_order: BitOrder,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 10_000_000, // 10 MHz
            mode: Mode::Mode0,
            bit_order: BitOrder::MsbFirst,
        }
    }
}

impl ClockConfig {
    /// Create a mode 0, MSB-first configuration at the given rate
    pub const fn with_frequency(frequency_hz: u32) -> Self {
        Self {
            frequency_hz,
            mode: Mode::Mode0,
            bit_order: BitOrder::MsbFirst,
        }
    }

    /// Duration of one clock period in nanoseconds (0 if the rate is 0)
    pub fn period_ns(&self) -> u32 {
        if self.frequency_hz == 0 {
            return 0;
        }
        1_000_000_000 / self.frequency_hz
    }
}

/// Clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// Clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}

/// Bit order on the data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BitOrder {
    /// Most significant bit first (every supported LED chip)
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_split() {
        let (polarity, phase) = Mode::Mode3.into();
        assert_eq!(polarity, Polarity::IdleHigh);
        assert_eq!(phase, Phase::CaptureOnSecondTransition);
    }

    #[test]
    fn test_period() {
        assert_eq!(ClockConfig::with_frequency(2_400_000).period_ns(), 416);
        assert_eq!(ClockConfig::with_frequency(0).period_ns(), 0);
    }
}
