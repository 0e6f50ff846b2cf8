//! Adaptive IMA predictor state

use crate::{IMA_INDEX_TABLE, IMA_STEP_TABLE, MAX_STEP_INDEX, clamp_i16};

/// IMA ADPCM predictor state
///
/// Carried from sample to sample (and across block boundaries). The block
/// header is a snapshot of this state, so a decoder can resume at any block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImaState {
    /// Last reconstructed sample, always within i16 range
    pub predictor: i32,

    /// Index into `IMA_STEP_TABLE`, always within 0..=88
    pub step_index: i32,
}

impl Default for ImaState {
    fn default() -> Self {
        Self::new()
    }
}

impl ImaState {
    /// Create state with a zero predictor and the smallest step
    #[must_use]
    pub fn new() -> Self {
        Self {
            predictor: 0,
            step_index: 0,
        }
    }

    /// Current quantizer step size
    #[inline]
    #[must_use]
    pub fn step(&self) -> i32 {
        IMA_STEP_TABLE[self.step_index as usize]
    }

    /// Block header for the current state
    ///
    /// Only the upper 9 bits of the predictor survive; the low 7 bits carry
    /// the step index.
    #[inline]
    #[must_use]
    pub fn header(&self) -> u16 {
        ((self.predictor as i16 as u16) & 0xFF80) | (self.step_index as u16 & 0x7F)
    }

    /// Quantize one sample against the current prediction
    ///
    /// Returns the 4-bit code (sign in bit 3). State is not touched; call
    /// [`ImaState::update`] with the result.
    #[must_use]
    pub fn quantize(&self, sample: i16) -> u8 {
        let mut difference = sample as i32 - self.predictor;
        let mut code = 0u8;
        if difference < 0 {
            code = 1 << 3;
            difference = -difference;
        }

        // Magnitude bits, halving the step for each
        let mut mask = 1u8 << 2;
        let mut step = self.step();
        while mask != 0 {
            if difference >= step {
                code |= mask;
                difference -= step;
            }
            step >>= 1;
            mask >>= 1;
        }

        code
    }

    /// Advance the predictor and step index with an emitted code
    ///
    /// Uses the same integer reconstruction as a decoder, so encoder and
    /// decoder predictors never drift apart.
    pub fn update(&mut self, code: u8) {
        let step = self.step();
        let mut delta = step >> 3;
        if code & 0b100 != 0 {
            delta += step;
        }
        if code & 0b010 != 0 {
            delta += step >> 1;
        }
        if code & 0b001 != 0 {
            delta += step >> 2;
        }
        if code & 0b1000 != 0 {
            delta = -delta;
        }

        self.predictor = clamp_i16(self.predictor + delta);
        self.step_index =
            (self.step_index + IMA_INDEX_TABLE[(code & 0x0F) as usize]).clamp(0, MAX_STEP_INDEX);
    }
}
