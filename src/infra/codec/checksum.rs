//! Pluggable integrity check. The codec only needs a 32-bit function over
//! `header..payload` with a seed; any standard CRC-32 satisfies it.

/// Strategy computing the 32-bit checksum of a frame.
pub trait Checksum {
    /// Checksum of `bytes`, continuing from `seed` (frames always use `0`).
    fn checksum(&self, bytes: &[u8], seed: u32) -> u32;
}

/// Plain functions and closures can be plugged in directly.
impl<F> Checksum for F
where
    F: Fn(&[u8], u32) -> u32,
{
    fn checksum(&self, bytes: &[u8], seed: u32) -> u32 {
        self(bytes, seed)
    }
}

/// Default strategy: IEEE CRC-32 (reflected, polynomial `0xEDB88320`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32;

impl Checksum for Crc32 {
    fn checksum(&self, bytes: &[u8], seed: u32) -> u32 {
        let mut hasher = crc32fast::Hasher::new_with_initial(seed);
        hasher.update(bytes);
        hasher.finalize()
    }
}
