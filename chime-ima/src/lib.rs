//! Chime-IMA: IMA 4:1 ADPCM encoder for iMac startup chimes
//!
//! The boot ROM of the early iMacs stores its startup chime as a headerless
//! stream of IMA ADPCM blocks, laid out the way QuickTime's `ima4` codec does it.
//!
//! **This is a pure codec** - it only compresses sample data. Where the blocks
//! live inside a ROM image (and how many of them there are) is decided by the
//! caller (chime-firmware's `FirmwareProfile`).
//!
//! # Block Format
//!
//! ```text
//! Block (34 bytes, repeats):
//!   0x00: header (u16 BE)
//!           bits 7-15: upper 9 bits of the predictor
//!           bits 0-6:  step index (0-88)
//!   0x02: 32 bytes of codes, 2 per byte
//!           low nibble  = earlier sample
//!           high nibble = later sample
//! ```
//!
//! Each 4-bit code is a sign bit (bit 3) and a 3-bit magnitude found by
//! successive approximation against the current step size.
//!
//! # Compression
//!
//! Exactly 4:1 for whole blocks: 64 samples (128 bytes) become 34 bytes.
//!
//! # Usage
//!
//! ```
//! use chime_ima::{encode_ima, BYTES_PER_BLOCK, SAMPLES_PER_BLOCK};
//!
//! let samples: Vec<i16> = vec![0; SAMPLES_PER_BLOCK * 4];
//! let blocks = encode_ima(&samples);
//! assert_eq!(blocks.len(), BYTES_PER_BLOCK * 4);
//! ```

mod encode;
mod state;

pub use encode::{ImaEncoder, encode_ima, samples_from_be_bytes};
pub use state::ImaState;

// =============================================================================
// Constants
// =============================================================================

/// Samples covered by one block
pub const SAMPLES_PER_BLOCK: usize = 64;

/// Block header size (predictor + step index)
pub const BLOCK_HEADER_SIZE: usize = 2;

/// Total block size (header + 64 nibbles)
pub const BYTES_PER_BLOCK: usize = BLOCK_HEADER_SIZE + SAMPLES_PER_BLOCK / 2;

/// Bytes per input sample (16-bit)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Step index adjustment, indexed by the 4-bit code
pub const IMA_INDEX_TABLE: [i32; 16] = [
    -1, -1, -1, -1, 2, 4, 6, 8, //
    -1, -1, -1, -1, 2, 4, 6, 8,
];

/// Quantizer step sizes (89 entries)
pub const IMA_STEP_TABLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 21, 23, 25, 28, 31, 34, 37, 41, 45, 50, 55, 60, 66,
    73, 80, 88, 97, 107, 118, 130, 143, 157, 173, 190, 209, 230, 253, 279, 307, 337, 371, 408,
    449, 494, 544, 598, 658, 724, 796, 876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066,
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, 5894, 6484, 7132, 7845, 8630,
    9493, 10442, 11487, 12635, 13899, 15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794,
    32767,
];

/// Highest legal step index
pub const MAX_STEP_INDEX: i32 = IMA_STEP_TABLE.len() as i32 - 1;

/// Compressed size of `samples` samples, counting a trailing partial block as whole.
#[must_use]
pub const fn compressed_len(samples: usize) -> usize {
    samples.div_ceil(SAMPLES_PER_BLOCK) * BYTES_PER_BLOCK
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Clamp value to 16-bit signed range
#[inline]
pub(crate) fn clamp_i16(v: i32) -> i32 {
    v.clamp(-32768, 32767)
}

// =============================================================================
// Tests
// =============================================================================
