//! Bit addressing over byte-string keys.
//!
//! A key is read as an infinite bit string made of two regions:
//!
//! - **data bits** `0..LENGTH_BITS`: byte `i / 8` of the key, MSB first. Bytes
//!   past the end of the key read as zero.
//! - **length bits** `LENGTH_BITS..LENGTH_BITS + 64`: the key length as a
//!   big-endian `u64`. Everything past that reads as zero.
//!
//! Keys that agree on every data bit (`b"a"` and `b"a\0"`) still differ in the
//! length region, so two distinct keys always have a first differing bit.
//! Walking a trie built on this ordering low-before-high visits keys in
//! lexicographic byte order.

/// First bit index of the length region.
pub(crate) const LENGTH_BITS: u64 = 1 << 62;

/// Returns bit `i` of `key` (`0` or `1`).
#[inline]
pub(crate) fn bit(key: &[u8], i: u64) -> usize {
    if i < LENGTH_BITS {
        let byte_idx = i / 8;
        if byte_idx >= key.len() as u64 {
            return 0;
        }
        let byte = key[byte_idx as usize];
        usize::from((byte >> (7 - (i % 8) as u32)) & 1)
    } else {
        let off = i - LENGTH_BITS;
        if off >= 64 {
            return 0;
        }
        ((key.len() as u64 >> (63 - off)) & 1) as usize
    }
}

/// Smallest bit index at which `a` and `b` differ, or `None` if they are equal.
pub(crate) fn first_differing_bit(a: &[u8], b: &[u8]) -> Option<u64> {
    let common = a.len().min(b.len());
    if let Some(idx) = (0..common).find(|&i| a[i] != b[i]) {
        return Some(byte_diff_bit(idx, a[idx] ^ b[idx]));
    }

    // Past the shorter key the longer one is compared against zero padding.
    let longer = if a.len() > b.len() { a } else { b };
    if let Some(idx) = (common..longer.len()).find(|&i| longer[i] != 0) {
        return Some(byte_diff_bit(idx, longer[idx]));
    }

    if a.len() == b.len() {
        return None;
    }
    let xor = a.len() as u64 ^ b.len() as u64;
    Some(LENGTH_BITS + u64::from(xor.leading_zeros()))
}

#[inline]
fn byte_diff_bit(byte_idx: usize, xor: u8) -> u64 {
    debug_assert_ne!(xor, 0);
    byte_idx as u64 * 8 + u64::from(xor.leading_zeros())
}
