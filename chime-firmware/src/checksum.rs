//! Adler-32, as used for both the ROM image and the whole firmware file.

/// Largest prime below 2^16.
pub const MOD_ADLER: u32 = 65521;

/// Running Adler-32 state.
///
/// Lets the ROM checksum cover a region plus a long run of pad bytes without
/// building the padded copy in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    /// Feed `count` copies of `byte`.
    pub fn update_repeated(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.push(byte);
        }
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.a = (self.a + u32::from(byte)) % MOD_ADLER;
        self.b = (self.b + self.a) % MOD_ADLER;
    }

    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

/// Adler-32 of the whole buffer.
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut state = Adler32::new();
    state.update(bytes);
    state.finish()
}

/// Adler-32 of the first `len` bytes (the whole buffer if `len` is past the end).
pub fn adler32_prefix(bytes: &[u8], len: usize) -> u32 {
    adler32(&bytes[..len.min(bytes.len())])
}
