//! Self-clocking bit encoding
//!
//! One-wire chips tell a 0 from a 1 by the width of the high pulse inside a
//! fixed bit period. A clocked or parallel peripheral reproduces that by
//! emitting `width` transport bits per logical bit:
//!
//! ```text
//! logical 0  ─┐__      width 3, zero = 0b100
//! logical 1  ──┐_      width 3, one  = 0b110
//! ```
//!
//! The transport bit rate is `width / period`. [`BitPattern::from_timing`]
//! derives the patterns from a chip's datasheet timing and refuses widths
//! that cannot meet its tolerance.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest usable transport bits per logical bit
pub const MIN_WIDTH: u8 = 2;

/// Largest usable transport bits per logical bit
pub const MAX_WIDTH: u8 = 8;

/// Bit pattern construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PatternError {
    /// Width outside 2..=8
    InvalidWidth,
    /// A pattern has bits set above `width`
    PatternTooWide,
    /// Zero and one patterns are the same
    IdenticalPatterns,
    /// The width cannot reproduce the chip's pulses within tolerance
    OutOfTolerance,
}

/// Datasheet timing of a one-wire chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OneWireTiming {
    /// High time of a 0 bit (ns)
    pub t0h_ns: u32,
    /// High time of a 1 bit (ns)
    pub t1h_ns: u32,
    /// Full bit period (ns)
    pub period_ns: u32,
    /// Allowed deviation of either high time (ns)
    pub tolerance_ns: u32,
    /// Low time that latches a frame (µs)
    pub reset_us: u32,
}

impl OneWireTiming {
    /// WS2812B/WS2813 and their clones, 800 kHz
    pub const WS2812X: Self = Self {
        t0h_ns: 400,
        t1h_ns: 800,
        period_ns: 1250,
        tolerance_ns: 150,
        reset_us: 300,
    };

    /// WS2811 in low-speed mode, 400 kHz
    pub const WS2811: Self = Self {
        t0h_ns: 500,
        t1h_ns: 1200,
        period_ns: 2500,
        tolerance_ns: 150,
        reset_us: 50,
    };

    pub const SK6812: Self = Self {
        t0h_ns: 300,
        t1h_ns: 600,
        period_ns: 1250,
        tolerance_ns: 150,
        reset_us: 80,
    };

    pub const APA106: Self = Self {
        t0h_ns: 350,
        t1h_ns: 1360,
        period_ns: 1710,
        tolerance_ns: 150,
        reset_us: 50,
    };

    pub const TM1814: Self = Self {
        t0h_ns: 360,
        t1h_ns: 720,
        period_ns: 1250,
        tolerance_ns: 150,
        reset_us: 200,
    };
}

/// Transport bit patterns for logical 0 and 1
///
/// Patterns are read MSB-first within their `width` low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BitPattern {
    width: u8,
    zero: u8,
    one: u8,
}

impl BitPattern {
    /// Build a pattern pair, validating width and contents
    pub fn new(width: u8, zero: u8, one: u8) -> Result<Self, PatternError> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
            return Err(PatternError::InvalidWidth);
        }
        let mask = (1u16 << width) - 1;
        if u16::from(zero) & !mask != 0 || u16::from(one) & !mask != 0 {
            return Err(PatternError::PatternTooWide);
        }
        if zero == one {
            return Err(PatternError::IdenticalPatterns);
        }
        Ok(Self { width, zero, one })
    }

    /// Derive patterns from a chip's timing at `width` transport bits per bit
    ///
    /// Each pattern is a run of leading ones whose length is the high time
    /// rounded to the nearest transport bit. Both patterns keep at least one
    /// high and one low transport bit.
    pub fn from_timing(timing: OneWireTiming, width: u8) -> Result<Self, PatternError> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
            return Err(PatternError::InvalidWidth);
        }
        if timing.period_ns == 0 {
            return Err(PatternError::OutOfTolerance);
        }

        let zero_ones = high_bits(timing.t0h_ns, timing.period_ns, width);
        let one_ones = high_bits(timing.t1h_ns, timing.period_ns, width);

        for (ones, target) in [(zero_ones, timing.t0h_ns), (one_ones, timing.t1h_ns)] {
            if ones == 0 || ones >= width {
                return Err(PatternError::OutOfTolerance);
            }
            let produced = u64::from(ones) * u64::from(timing.period_ns) / u64::from(width);
            if produced.abs_diff(u64::from(target)) > u64::from(timing.tolerance_ns) {
                return Err(PatternError::OutOfTolerance);
            }
        }

        Self::new(width, leading_ones(zero_ones, width), leading_ones(one_ones, width))
            .map_err(|_| PatternError::OutOfTolerance)
    }

    /// Transport bits per logical bit
    pub const fn width(&self) -> u8 {
        self.width
    }

    /// Pattern for a logical 0
    pub const fn zero(&self) -> u8 {
        self.zero
    }

    /// Pattern for a logical 1
    pub const fn one(&self) -> u8 {
        self.one
    }

    /// Transport bit rate needed for a logical bit period of `period_ns`
    pub fn bit_rate_hz(&self, period_ns: u32) -> u32 {
        if period_ns == 0 {
            return 0;
        }
        u32::try_from(u64::from(self.width) * 1_000_000_000 / u64::from(period_ns))
            .unwrap_or(u32::MAX)
    }

    /// Transport bits produced for `payload_len` bytes
    pub const fn encoded_bits(&self, payload_len: usize) -> usize {
        payload_len * 8 * self.width as usize
    }

    /// Packed bytes produced for `payload_len` bytes
    pub const fn encoded_len(&self, payload_len: usize) -> usize {
        self.encoded_bits(payload_len).div_ceil(8)
    }

    /// Zero bytes that hold the line low for `reset_us` at this bit rate
    pub fn reset_len(&self, reset_us: u32, period_ns: u32) -> usize {
        if period_ns == 0 {
            return 0;
        }
        let bits = (u64::from(reset_us) * 1000 * u64::from(self.width))
            .div_ceil(u64::from(period_ns));
        bits.div_ceil(8) as usize
    }

    /// Expand `payload` MSB-first into packed transport bits
    ///
    /// Unused bits of the last byte are zero. Returns the bytes written,
    /// which is `encoded_len(payload.len())` unless `out` is shorter.
    pub fn encode(&self, payload: &[u8], out: &mut [u8]) -> usize {
        let len = self.encoded_len(payload.len()).min(out.len());
        out[..len].fill(0);

        let mut position = 0usize;
        for bit in logical_bits(payload) {
            let pattern = if bit { self.one } else { self.zero };
            for shift in (0..self.width).rev() {
                if (pattern >> shift) & 1 == 1 {
                    let index = position / 8;
                    if index >= len {
                        return len;
                    }
                    out[index] |= 0x80 >> (position % 8);
                }
                position += 1;
            }
        }
        len
    }

    /// OR one lane's transport bits into a multi-lane sample buffer
    ///
    /// Transport bit `n` is sample `n`; each sample is `sample_bytes` wide,
    /// little-endian, with lane `lane` at bit position `lane`. Samples past
    /// the end of `out` are dropped. Other lanes' bits are left untouched.
    pub fn encode_into_lane(&self, payload: &[u8], out: &mut [u8], lane: u8, sample_bytes: usize) {
        let Some((offset, mask)) = lane_position(lane, sample_bytes) else {
            return;
        };

        let mut sample = 0usize;
        for bit in logical_bits(payload) {
            let pattern = if bit { self.one } else { self.zero };
            for shift in (0..self.width).rev() {
                let index = sample * sample_bytes + offset;
                if index >= out.len() {
                    return;
                }
                if (pattern >> shift) & 1 == 1 {
                    out[index] |= mask;
                }
                sample += 1;
            }
        }
    }
}

/// Clear one lane's bit in every sample of a multi-lane buffer
pub fn clear_lane(out: &mut [u8], lane: u8, sample_bytes: usize) {
    let Some((offset, mask)) = lane_position(lane, sample_bytes) else {
        return;
    };
    for sample in out.chunks_exact_mut(sample_bytes) {
        sample[offset] &= !mask;
    }
}

fn lane_position(lane: u8, sample_bytes: usize) -> Option<(usize, u8)> {
    let offset = usize::from(lane / 8);
    if sample_bytes == 0 || offset >= sample_bytes {
        return None;
    }
    Some((offset, 1 << (lane % 8)))
}

fn logical_bits(payload: &[u8]) -> impl Iterator<Item = bool> + '_ {
    payload
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
}

fn high_bits(high_ns: u32, period_ns: u32, width: u8) -> u8 {
    let scaled = u64::from(high_ns) * u64::from(width);
    let rounded = (scaled + u64::from(period_ns) / 2) / u64::from(period_ns);
    rounded.min(u64::from(width)) as u8
}

fn leading_ones(count: u8, width: u8) -> u8 {
    let ones = (1u16 << count) - 1;
    (ones << (width - count)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    fn three_bit() -> BitPattern {
        BitPattern::new(3, 0b100, 0b110).unwrap()
    }

    #[test]
    fn test_encode_three_bit_example() {
        let pattern = three_bit();
        let mut out = [0u8; 3];
        let written = pattern.encode(&[0b1011_0000], &mut out);

        // 110 100 110 110 100 100 100 100
        assert_eq!(written, 3);
        assert_eq!(out, [0b1101_0011, 0b0110_1001, 0b0010_0100]);
    }

    #[test]
    fn test_encode_clears_output() {
        let pattern = BitPattern::new(5, 0b10000, 0b11100).unwrap();
        assert_eq!(pattern.encoded_len(1), 5);
        let mut out = [0xFFu8; 5];
        pattern.encode(&[0xFF], &mut out);
        assert_eq!(out, [0b1110_0111, 0b0011_1001, 0b1100_1110, 0b0111_0011, 0b1001_1100]);
    }

    #[test]
    fn test_encode_short_output() {
        let pattern = three_bit();
        let mut out = [0u8; 1];
        assert_eq!(pattern.encode(&[0xFF], &mut out), 1);
        assert_eq!(out, [0b1101_1011]);
    }

    #[test]
    fn test_new_validation() {
        assert_eq!(BitPattern::new(1, 0, 1), Err(PatternError::InvalidWidth));
        assert_eq!(BitPattern::new(9, 0, 1), Err(PatternError::InvalidWidth));
        assert_eq!(BitPattern::new(3, 0b1000, 0b110), Err(PatternError::PatternTooWide));
        assert_eq!(BitPattern::new(3, 0b100, 0b100), Err(PatternError::IdenticalPatterns));
        assert!(BitPattern::new(8, 0b1100_0000, 0b1111_0000).is_ok());
    }

    #[test]
    fn test_from_timing_ws2812() {
        let pattern = BitPattern::from_timing(OneWireTiming::WS2812X, 3).unwrap();
        assert_eq!(pattern, three_bit());
        assert_eq!(pattern.bit_rate_hz(OneWireTiming::WS2812X.period_ns), 2_400_000);

        let four = BitPattern::from_timing(OneWireTiming::WS2812X, 4).unwrap();
        assert_eq!(four.zero(), 0b1000);
        assert_eq!(four.one(), 0b1110);
    }

    #[test]
    fn test_bit_rate_saturates() {
        let pattern = BitPattern::new(8, 0b1000_0000, 0b1110_0000).unwrap();
        assert_eq!(pattern.bit_rate_hz(0), 0);
        assert_eq!(pattern.bit_rate_hz(2), 4_000_000_000);
        assert_eq!(pattern.bit_rate_hz(1), u32::MAX);
    }

    #[test]
    fn test_from_timing_rejects_out_of_tolerance() {
        // 3 bits cannot tell SK6812's 300 ns from its 600 ns
        assert_eq!(
            BitPattern::from_timing(OneWireTiming::SK6812, 3),
            Err(PatternError::OutOfTolerance)
        );
        let four = BitPattern::from_timing(OneWireTiming::SK6812, 4).unwrap();
        assert_eq!((four.zero(), four.one()), (0b1000, 0b1100));
    }

    #[test]
    fn test_from_timing_presets_have_a_width() {
        for timing in [
            OneWireTiming::WS2812X,
            OneWireTiming::WS2811,
            OneWireTiming::SK6812,
            OneWireTiming::APA106,
            OneWireTiming::TM1814,
        ] {
            assert!((MIN_WIDTH..=MAX_WIDTH).any(|w| BitPattern::from_timing(timing, w).is_ok()));
        }
    }

    #[test]
    fn test_reset_len() {
        let pattern = three_bit();
        // 300 µs at 2.4 Mbit/s is 720 bits
        assert_eq!(pattern.reset_len(300, 1250), 90);
        assert_eq!(pattern.reset_len(0, 1250), 0);
    }

    #[test]
    fn test_encode_into_lane() {
        let pattern = three_bit();
        let mut out = vec![0u8; pattern.encoded_bits(1)];
        pattern.encode_into_lane(&[0x80], &mut out, 2, 1);
        pattern.encode_into_lane(&[0x00], &mut out, 0, 1);

        // lane 2 sends 1 then 0s, lane 0 sends all 0s
        assert_eq!(&out[..6], &[0b101, 0b100, 0b000, 0b101, 0b000, 0b000]);

        clear_lane(&mut out, 2, 1);
        assert_eq!(&out[..3], &[0b001, 0b000, 0b000]);
    }

    #[test]
    fn test_encode_into_upper_lane_of_wide_samples() {
        let pattern = three_bit();
        let mut out = vec![0u8; pattern.encoded_bits(1) * 2];
        pattern.encode_into_lane(&[0x80], &mut out, 9, 2);
        assert_eq!(&out[..6], &[0, 0b10, 0, 0b10, 0, 0]);

        // out of range lanes are ignored
        pattern.encode_into_lane(&[0xFF], &mut out, 16, 2);
        assert_eq!(&out[..6], &[0, 0b10, 0, 0b10, 0, 0]);
    }

    fn decode_chunks(pattern: &BitPattern, encoded: &[u8], bits: usize) -> Vec<u8> {
        let width = usize::from(pattern.width());
        (0..bits / width)
            .map(|chunk| {
                (0..width).fold(0u8, |acc, i| {
                    let position = chunk * width + i;
                    let bit = (encoded[position / 8] >> (7 - position % 8)) & 1;
                    (acc << 1) | bit
                })
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_encoded_length_and_fidelity(
            payload in proptest::collection::vec(any::<u8>(), 0..32),
            width in MIN_WIDTH..=MAX_WIDTH,
        ) {
            let zero = 1u8 << (width - 1);
            let one = zero | (zero >> 1);
            let pattern = BitPattern::new(width, zero, one).unwrap();

            let mut out = vec![0u8; pattern.encoded_len(payload.len())];
            let written = pattern.encode(&payload, &mut out);
            prop_assert_eq!(written, (payload.len() * 8 * usize::from(width)).div_ceil(8));

            let chunks = decode_chunks(&pattern, &out, pattern.encoded_bits(payload.len()));
            for (i, chunk) in chunks.iter().enumerate() {
                let bit = (payload[i / 8] >> (7 - i % 8)) & 1 == 1;
                prop_assert_eq!(*chunk, if bit { one } else { zero });
            }
        }
    }
}
