//! The Poly1305 one-time authenticator.
//!
//! Poly1305 evaluates a polynomial over the prime field modulo
//! 2^130 - 5 at a secret point `r`, then blinds the result with a
//! second secret `s`. The 130-bit accumulator is split into five
//! 26-bit limbs so that every product fits comfortably in 64
//! bits, with carries between the limbs delayed.
//!
//! The reduction uses the identity
//!
//! ```text
//! a * 2^130 = a * 5 (mod 2^130 - 5)
//! ```
//!
//! so any limb or carry at or above 2^130 is multiplied by 5 and
//! folded back into the low limbs.
//!
//! # Warning
//!
//! A key must authenticate exactly one message. Tagging two
//! different messages under the same key lets an attacker solve
//! for `r` and forge tags at will. The AEAD derives a fresh key
//! per (key, nonce) pair; callers using this module directly must
//! do the same.

use {
    byteorder::{ByteOrder, LittleEndian},
    core::{cmp, iter::zip},
    subtle::{Choice, ConditionallySelectable},
    zeroize::{Zeroize, ZeroizeOnDrop},
};

use crate::{constant_time, Error};

/// The size in octets of a one-time key.
pub const KEY_SIZE: usize = 32;

/// The size in octets of an authentication tag.
pub const TAG_SIZE: usize = 16;

/// The size in octets of a message block.
const BLOCK_SIZE: usize = 16;

/// The value of each 26-bit limb is kept below this mask plus
/// one, except for delayed carries.
const LIMB_MASK: u32 = 0x03ff_ffff;

/// Computes the Poly1305 tag for `msg` under `key`.
///
/// The key must be exactly [`KEY_SIZE`] octets.
pub fn compute_tag(key: &[u8], msg: &[u8]) -> Result<[u8; TAG_SIZE], Error> {
    let mut mac = Poly1305::new(key)?;
    mac.update(msg);
    Ok(mac.finalize())
}

/// Recomputes the tag for `msg` under `key` and compares it with
/// `tag` in constant time.
pub fn verify_tag(
    key: &[u8],
    msg: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<bool, Error> {
    let mut mac = Poly1305::new(key)?;
    mac.update(msg);
    Ok(mac.verify(tag).is_ok())
}

/// The Poly1305 one-time authenticator.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Poly1305 {
    /// Accumulator, five 26-bit limbs.
    a: [u32; 5],
    /// Clamped multiplier, five 26-bit limbs.
    r: [u32; 5],
    /// Additive secret, four 32-bit words.
    s: [u32; 4],
    /// Buffered partial block.
    buf: [u8; BLOCK_SIZE],
    /// Number of bytes buffered in `buf`.
    len: usize,
}

impl Poly1305 {
    /// Creates an authenticator from a one-time key.
    ///
    /// The key must be exactly [`KEY_SIZE`] octets. The low half
    /// is the polynomial point `r`, clamped with the mask
    /// `0x0ffffffc0ffffffc0ffffffc0fffffff`; the high half is the
    /// additive secret `s`. The clamp is folded into the limb
    /// extraction below.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidMacKey);
        }
        Ok(Self {
            a: [0; 5],
            r: [
                LittleEndian::read_u32(&key[0..4]) & 0x03ff_ffff,
                LittleEndian::read_u32(&key[3..7]) >> 2 & 0x03ff_ff03,
                LittleEndian::read_u32(&key[6..10]) >> 4 & 0x03ff_c0ff,
                LittleEndian::read_u32(&key[9..13]) >> 6 & 0x03f0_3fff,
                LittleEndian::read_u32(&key[12..16]) >> 8 & 0x000f_ffff,
            ],
            s: [
                LittleEndian::read_u32(&key[16..20]),
                LittleEndian::read_u32(&key[20..24]),
                LittleEndian::read_u32(&key[24..28]),
                LittleEndian::read_u32(&key[28..32]),
            ],
            buf: [0u8; BLOCK_SIZE],
            len: 0,
        })
    }

    /// Absorbs `msg` into the accumulator.
    ///
    /// Multiple calls to [`update`][Self::update] behave as if
    /// the concatenation of the `msg` buffers were passed in a
    /// single run.
    pub fn update(&mut self, mut msg: &[u8]) {
        // Top up a buffered partial block first.
        if self.len != 0 {
            let n = cmp::min(BLOCK_SIZE - self.len, msg.len());
            self.buf[self.len..self.len + n].copy_from_slice(&msg[..n]);
            self.len += n;
            msg = &msg[n..];
            if self.len < BLOCK_SIZE {
                return;
            }
            let block = self.buf;
            self.block(&block);
            self.buf.zeroize();
            self.len = 0;
        }

        let mut blocks = msg.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            self.block(block);
        }

        let rem = blocks.remainder();
        if !rem.is_empty() {
            self.buf[..rem.len()].copy_from_slice(rem);
            self.len = rem.len();
        }
    }

    /// Absorbs `msg` followed by enough zero octets to reach the
    /// next 16-octet boundary.
    ///
    /// This is the AEAD's framing primitive. The absorbed stream
    /// must itself be at a block boundary when this is called.
    pub fn update_padded(&mut self, msg: &[u8]) {
        self.update(msg);
        let rem = msg.len() % BLOCK_SIZE;
        if rem != 0 {
            const PAD: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];
            self.update(&PAD[rem..]);
        }
    }

    /// Completes the computation, returning the tag.
    pub fn finalize(mut self) -> [u8; TAG_SIZE] {
        // The final partial block is extended with 0x01 and
        // zero-filled; it does not get the 2^128 bit.
        if self.len != 0 {
            let mut buf = [0u8; 17];
            buf[..self.len].copy_from_slice(&self.buf[..self.len]);
            buf[self.len] = 1;
            self.accumulate(
                LittleEndian::read_u32(&buf[0..4]) & LIMB_MASK,
                LittleEndian::read_u32(&buf[3..7]) >> 2 & LIMB_MASK,
                LittleEndian::read_u32(&buf[6..10]) >> 4 & LIMB_MASK,
                LittleEndian::read_u32(&buf[9..13]) >> 6 & LIMB_MASK,
                LittleEndian::read_u32(&buf[13..17]),
            );
            buf.zeroize();
        }

        self.reduce();

        // Convert from 5x26-bit to 4x32-bit.
        let a = [
            self.a[0] | self.a[1] << 26,
            self.a[1] >> 6 | self.a[2] << 20,
            self.a[2] >> 12 | self.a[3] << 14,
            self.a[3] >> 18 | self.a[4] << 8,
        ];

        // tag = (a + s) mod 2^128; the carry out of the top word
        // is dropped.
        let mut tag = [0u8; TAG_SIZE];
        let mut carry = 0u64;
        for (chunk, (a, s)) in
            zip(tag.chunks_exact_mut(4), zip(a, self.s))
        {
            let t = u64::from(a) + u64::from(s) + carry;
            LittleEndian::write_u32(chunk, t as u32);
            carry = t >> 32;
        }
        tag
    }

    /// Completes the computation and checks the result against
    /// `tag` in constant time.
    pub fn verify(self, tag: &[u8; TAG_SIZE]) -> Result<(), Error> {
        let mut expect = self.finalize();
        let ok = constant_time::verify_16(&expect, tag);
        expect.zeroize();
        if ok {
            Ok(())
        } else {
            Err(Error::Authentication)
        }
    }

    /// Absorbs one full 16-octet block, extended with the 2^128
    /// bit from the implicit 0x01 octet.
    fn block(&mut self, block: &[u8]) {
        self.accumulate(
            LittleEndian::read_u32(&block[0..4]) & LIMB_MASK,
            LittleEndian::read_u32(&block[3..7]) >> 2 & LIMB_MASK,
            LittleEndian::read_u32(&block[6..10]) >> 4 & LIMB_MASK,
            LittleEndian::read_u32(&block[9..13]) >> 6 & LIMB_MASK,
            LittleEndian::read_u32(&block[12..16]) >> 8 | 1 << 24,
        )
    }

    /// Sets `a = (a + n) * r mod 2^130 - 5`.
    fn accumulate(&mut self, n0: u32, n1: u32, n2: u32, n3: u32, n4: u32) {
        // The limbs stay far enough below 32 bits that the sum
        // cannot overflow.
        self.a[0] += n0;
        self.a[1] += n1;
        self.a[2] += n2;
        self.a[3] += n3;
        self.a[4] += n4;
        self.mul_r();
    }

    /// Sets `a = a * r mod 2^130 - 5`.
    fn mul_r(&mut self) {
        // Schoolbook multiplication; every product lands in the
        // limb at i + j, and products at or above limb 5 carry an
        // implicit factor of 2^130, so they fold back into limb
        // i + j - 5 multiplied by 5.
        let mut t = [0u64; 5];
        for (i, &a) in self.a.iter().enumerate() {
            for (j, &r) in self.r.iter().enumerate() {
                let m = u64::from(a) * u64::from(r);
                if i + j < 5 {
                    t[i + j] += m;
                } else {
                    t[i + j - 5] += 5 * m;
                }
            }
        }

        // Propagate carries.
        t[1] += t[0] >> 26;
        t[2] += t[1] >> 26;
        t[3] += t[2] >> 26;
        t[4] += t[3] >> 26;

        // Mask out carries.
        self.a[0] = t[0] as u32 & LIMB_MASK;
        self.a[1] = t[1] as u32 & LIMB_MASK;
        self.a[2] = t[2] as u32 & LIMB_MASK;
        self.a[3] = t[3] as u32 & LIMB_MASK;
        self.a[4] = t[4] as u32 & LIMB_MASK;

        // Fold the high carry back into the low limbs.
        self.a[0] += (t[4] >> 26) as u32 * 5;
        self.a[1] += self.a[0] >> 26;
        self.a[0] &= LIMB_MASK;

        // A carry of at most 1 bit is left in a[1]; the next
        // multiplication absorbs it.
    }

    /// Fully reduces the accumulator into the canonical range
    /// [0, 2^130 - 5).
    fn reduce(&mut self) {
        // Finish the delayed carries.
        self.a[2] += self.a[1] >> 26;
        self.a[3] += self.a[2] >> 26;
        self.a[4] += self.a[3] >> 26;
        self.a[0] += (self.a[4] >> 26) * 5;
        self.a[1] += self.a[0] >> 26;

        self.a[0] &= LIMB_MASK;
        self.a[1] &= LIMB_MASK;
        self.a[2] &= LIMB_MASK;
        self.a[3] &= LIMB_MASK;
        self.a[4] &= LIMB_MASK;

        // t = a - p. If the subtraction does not borrow, a was in
        // [p, 2^130) and t is the canonical value; keep whichever
        // is right without branching on it.
        let mut t = self.a;
        t[0] += 5;
        t[4] = t[4].wrapping_sub(1 << 26);

        t[1] += t[0] >> 26;
        t[2] += t[1] >> 26;
        t[3] += t[2] >> 26;
        t[4] = t[4].wrapping_add(t[3] >> 26);

        t[0] &= LIMB_MASK;
        t[1] &= LIMB_MASK;
        t[2] &= LIMB_MASK;
        t[3] &= LIMB_MASK;

        let borrowed = Choice::from((t[4] >> 31) as u8);
        for (a, t) in zip(self.a.iter_mut(), t) {
            *a = u32::conditional_select(&t, a, borrowed);
        }
    }
}

#[cfg(test)]
impl Poly1305 {
    /// Returns the fully reduced accumulator as 17 little-endian
    /// octets.
    fn residue(&self) -> [u8; 17] {
        let mut x = self.clone();
        x.reduce();

        let mut out = [0u8; 17];
        let mut acc = 0u64;
        let mut bits = 0;
        let mut k = 0;
        for &limb in x.a.iter() {
            acc |= u64::from(limb) << bits;
            bits += 26;
            while bits >= 8 {
                out[k] = acc as u8;
                acc >>= 8;
                bits -= 8;
                k += 1;
            }
        }
        out[k] = acc as u8;
        out
    }
}
