//! Constant-time comparisons.
//!
//! The tag check is the only place the protocol branches on data
//! derived from a secret, so the comparison must not leak where
//! two buffers first differ. These helpers accumulate the XOR of
//! every byte pair and test the accumulator once at the end; the
//! running time depends only on the lengths.

use subtle::ConstantTimeEq;

/// Compares `a` and `b` in constant time.
///
/// Returns true iff they have equal length and equal content.
/// The length check happens up front; the contents are always
/// compared in full, with no early exit.
#[must_use]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Compares two 16-octet tags in constant time.
#[must_use]
#[inline(never)]
pub fn verify_16(a: &[u8; 16], b: &[u8; 16]) -> bool {
    ct_eq(a, b)
}
