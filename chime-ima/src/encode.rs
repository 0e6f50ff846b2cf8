//! IMA block encoder implementation
//!
//! This module handles encoding PCM samples to IMA blocks.
//! Note: This is a pure codec - the input must already be padded to a whole
//! number of blocks if an exact `blocks * 34` output is required. The caller
//! (chime-firmware) pads the chime with silence before encoding.

use crate::{BLOCK_HEADER_SIZE, BYTES_PER_BLOCK, BYTES_PER_SAMPLE, ImaState, SAMPLES_PER_BLOCK};

/// Streaming IMA encoder
///
/// Writes a block header every 64 samples and packs codes two per byte.
#[derive(Clone, Debug, Default)]
pub struct ImaEncoder {
    state: ImaState,
    /// Samples written since the start of the current block
    sample_in_block: usize,
    /// Low nibble waiting for its partner
    pending: u8,
    output: Vec<u8>,
}

impl ImaEncoder {
    /// Create an encoder with fresh predictor state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder with room for `samples` samples of output
    #[must_use]
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            output: Vec::with_capacity(crate::compressed_len(samples)),
            ..Self::default()
        }
    }

    /// Current predictor state
    #[must_use]
    pub fn state(&self) -> ImaState {
        self.state
    }

    /// Encode one sample
    pub fn encode_sample(&mut self, sample: i16) {
        if self.sample_in_block == 0 {
            self.output.extend_from_slice(&self.state.header().to_be_bytes());
        }

        let code = self.state.quantize(sample);
        if self.sample_in_block % 2 == 0 {
            self.pending = code & 0x0F;
        } else {
            self.output.push(self.pending | (code << 4));
        }

        self.state.update(code);
        self.sample_in_block = (self.sample_in_block + 1) % SAMPLES_PER_BLOCK;
    }

    /// Finish encoding and return the block data
    ///
    /// A trailing partial block is zero-filled to its full 34 bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        if self.sample_in_block != 0 {
            if self.sample_in_block % 2 == 1 {
                self.output.push(self.pending);
            }
            let block_start =
                self.output.len() - BLOCK_HEADER_SIZE - self.sample_in_block.div_ceil(2);
            self.output.resize(block_start + BYTES_PER_BLOCK, 0);
        }
        self.output
    }
}

/// Encode PCM samples to IMA blocks
///
/// # Arguments
/// * `samples` - Input PCM samples (mono, 16-bit)
///
/// # Returns
/// `ceil(samples / 64) * 34` bytes of block data
pub fn encode_ima(samples: &[i16]) -> Vec<u8> {
    let mut encoder = ImaEncoder::with_capacity(samples.len());
    for &sample in samples {
        encoder.encode_sample(sample);
    }
    encoder.finish()
}

/// Interpret raw big-endian 16-bit PCM bytes as samples
///
/// A trailing odd byte is ignored; callers reject odd-length input first.
pub fn samples_from_be_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}
