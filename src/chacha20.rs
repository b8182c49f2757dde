//! The ChaCha20 stream cipher.
//!
//! ChaCha20 turns a 256-bit key, a 96-bit nonce, and a 32-bit
//! block counter into a keystream that is XORed with the message.
//! Encryption and decryption are the same operation.
//!
//! The ciphertext is NOT authenticated. For an AEAD, see
//! [`ChaCha20Poly1305`][crate::ChaCha20Poly1305].

use {
    byteorder::{ByteOrder, LittleEndian},
    core::{
        cmp,
        iter::zip,
        ops::{Deref, DerefMut},
    },
    zeroize::{Zeroize, ZeroizeOnDrop},
};

use crate::{Error, BLOCK_SIZE, KEY_SIZE};

/// The size in octets of a nonce.
pub const NONCE_SIZE: usize = 12;

/// The number of blocks in the cipher's counter space.
const CTR_SPACE: u64 = 1 << 32;

/// Returns the number of blocks in `len`.
const fn num_blocks(len: usize) -> u64 {
    let mut n = (len / BLOCK_SIZE) as u64;
    if len % BLOCK_SIZE != 0 {
        n += 1;
    }
    n
}

/// Encrypts `plaintext` with the keystream for (key, nonce,
/// counter), writing the result to `dst`.
///
/// `dst` must be at least as long as `plaintext`. The key must be
/// exactly [`KEY_SIZE`][crate::KEY_SIZE] octets and the nonce
/// exactly [`NONCE_SIZE`] octets.
#[inline]
pub fn encrypt(
    key: &[u8],
    nonce: &[u8],
    ctr: u32,
    dst: &mut [u8],
    plaintext: &[u8],
) -> Result<(), Error> {
    ChaCha20::new_with_ctr(key, nonce, ctr)?.xor(dst, plaintext)
}

/// Decrypts `ciphertext` with the keystream for (key, nonce,
/// counter), writing the result to `dst`.
///
/// This is the same keystream XOR as [`encrypt`].
#[inline]
pub fn decrypt(
    key: &[u8],
    nonce: &[u8],
    ctr: u32,
    dst: &mut [u8],
    ciphertext: &[u8],
) -> Result<(), Error> {
    ChaCha20::new_with_ctr(key, nonce, ctr)?.xor(dst, ciphertext)
}

/// The ChaCha20 stream cipher.
#[derive(ZeroizeOnDrop)]
pub struct ChaCha20 {
    key: [u32; 8],
    nonce: [u32; 3],
    /// The next unused block counter. At most [`CTR_SPACE`];
    /// equality means the keystream is exhausted.
    ctr: u64,
    /// Contains leftover keystream.
    tmp: [u8; BLOCK_SIZE],
    /// Number of bytes available in `tmp`.
    len: usize,
}

impl ChaCha20 {
    /// The size in octets of a nonce.
    pub const NONCE_SIZE: usize = NONCE_SIZE;

    /// The size in octets of the largest keystream for one (key,
    /// nonce) pair, with a zero initial counter.
    pub const P_MAX: u64 = 1 << 38;

    /// Creates a new stream cipher with the block counter set to
    /// one, the value the AEAD construction encrypts from.
    ///
    /// The key must be exactly [`KEY_SIZE`][crate::KEY_SIZE]
    /// octets and the nonce exactly [`NONCE_SIZE`] octets.
    #[inline]
    pub fn new(key: &[u8], nonce: &[u8]) -> Result<Self, Error> {
        Self::new_with_ctr(key, nonce, 1)
    }

    /// Creates a new stream cipher with an explicit initial block
    /// counter.
    pub fn new_with_ctr(
        key: &[u8],
        nonce: &[u8],
        ctr: u32,
    ) -> Result<Self, Error> {
        Ok(Self::from_words(key_words(key)?, nonce_words(nonce)?, ctr))
    }

    pub(crate) fn from_words(
        key: [u32; 8],
        nonce: [u32; 3],
        ctr: u32,
    ) -> Self {
        Self {
            key,
            nonce,
            ctr: u64::from(ctr),
            tmp: [0u8; BLOCK_SIZE],
            len: 0,
        }
    }

    /// XORs each byte in `src` with a byte from the keystream.
    ///
    /// `dst` must be at least as long as `src`.
    ///
    /// Multiple calls to [`xor`][Self::xor] behave as if the
    /// concatenation of multiple `src` buffers were passed in a
    /// single run.
    pub fn xor(
        &mut self,
        mut dst: &mut [u8],
        mut src: &[u8],
    ) -> Result<(), Error> {
        if dst.len() < src.len() {
            return Err(Error::BufferTooSmall);
        }
        dst = &mut dst[..src.len()];

        // Is there any carryover?
        if self.len != 0 {
            let n = cmp::min(self.len, src.len());
            let start = BLOCK_SIZE - self.len;
            xor(dst, src, &self.tmp[start..start + n]);
            self.tmp[start..start + n].zeroize();
            self.len -= n;
            dst = &mut dst[n..];
            src = &src[n..];
        }
        if src.is_empty() {
            return Ok(());
        }

        self.reserve(src.len())?;

        let mut ctx = State::new(&self.key, self.ctr as u32, &self.nonce);

        // Full blocks.
        let mut dst = dst.chunks_exact_mut(BLOCK_SIZE);
        let mut src = src.chunks_exact(BLOCK_SIZE);
        for (dst, src) in zip(&mut dst, &mut src) {
            let mut ks = ctx.keystream();
            xor(dst, src, &ks);
            ks.zeroize();
            ctx.incr_ctr();
            self.ctr += 1;
        }

        // Partial block.
        let src = src.remainder();
        if !src.is_empty() {
            let dst = dst.into_remainder();

            self.tmp = ctx.keystream();
            self.ctr += 1;
            xor(dst, src, &self.tmp);
            self.tmp[..src.len()].zeroize();
            self.len = BLOCK_SIZE - src.len();
        }

        Ok(())
    }

    /// Same as [`xor`][Self::xor], but performed in-place.
    pub fn xor_in_place(&mut self, mut data: &mut [u8]) -> Result<(), Error> {
        // Is there any carryover?
        if self.len != 0 {
            let n = cmp::min(self.len, data.len());
            let start = BLOCK_SIZE - self.len;
            xor_in_place(data, &self.tmp[start..start + n]);
            self.tmp[start..start + n].zeroize();
            self.len -= n;
            data = &mut data[n..];
        }
        if data.is_empty() {
            return Ok(());
        }

        self.reserve(data.len())?;

        let mut ctx = State::new(&self.key, self.ctr as u32, &self.nonce);

        // Full blocks.
        let mut data = data.chunks_exact_mut(BLOCK_SIZE);
        for chunk in &mut data {
            let mut ks = ctx.keystream();
            xor_in_place(chunk, &ks);
            ks.zeroize();
            ctx.incr_ctr();
            self.ctr += 1;
        }

        // Partial block.
        let data = data.into_remainder();
        if !data.is_empty() {
            self.tmp = ctx.keystream();
            self.ctr += 1;
            xor_in_place(data, &self.tmp);
            self.tmp[..data.len()].zeroize();
            self.len = BLOCK_SIZE - data.len();
        }

        Ok(())
    }

    /// Checks that `len` more bytes of keystream fit in the
    /// remaining counter space.
    ///
    /// The counter is 32 bits wide; rather than letting it wrap,
    /// messages that would take it past 2^32 are refused before
    /// any work is done.
    fn reserve(&self, len: usize) -> Result<(), Error> {
        if num_blocks(len) > CTR_SPACE - self.ctr {
            return Err(Error::MessageTooLong);
        }
        Ok(())
    }
}

/// Sets `dst = x^y`.
///
/// NB: the lengths are allowed to differ.
#[inline(always)]
fn xor(dst: &mut [u8], x: &[u8], y: &[u8]) {
    for (v, (x, y)) in zip(dst, zip(x, y)) {
        *v = x ^ y;
    }
}

/// Sets `dst ^= src`.
///
/// NB: the lengths are allowed to differ.
#[inline(always)]
fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (x, y) in zip(dst, src) {
        *x ^= *y;
    }
}

/// Decodes a key into its little-endian words.
pub(crate) fn key_words(key: &[u8]) -> Result<[u32; 8], Error> {
    if key.len() != KEY_SIZE {
        return Err(Error::InvalidKey);
    }
    let mut out = [0u32; 8];
    for (w, chunk) in zip(out.iter_mut(), key.chunks_exact(4)) {
        *w = LittleEndian::read_u32(chunk);
    }
    Ok(out)
}

/// Decodes a nonce into its little-endian words.
pub(crate) fn nonce_words(nonce: &[u8]) -> Result<[u32; 3], Error> {
    if nonce.len() != NONCE_SIZE {
        return Err(Error::InvalidNonce);
    }
    let mut out = [0u32; 3];
    for (w, chunk) in zip(out.iter_mut(), nonce.chunks_exact(4)) {
        *w = LittleEndian::read_u32(chunk);
    }
    Ok(out)
}

/// The 4x4 matrix of words the block function permutes.
#[derive(Clone, ZeroizeOnDrop)]
pub(crate) struct State([u32; 16]);

impl State {
    pub(crate) const fn new(
        key: &[u32; 8],
        ctr: u32,
        nonce: &[u32; 3],
    ) -> Self {
        Self([
            u32::from_le_bytes(*b"expa"),
            u32::from_le_bytes(*b"nd 3"),
            u32::from_le_bytes(*b"2-by"),
            u32::from_le_bytes(*b"te k"),
            key[0],
            key[1],
            key[2],
            key[3],
            key[4],
            key[5],
            key[6],
            key[7],
            ctr,
            nonce[0],
            nonce[1],
            nonce[2],
        ])
    }

    /// Produces the 64-byte keystream block for the current
    /// state: 20 rounds over a copy, the original state added
    /// back word-wise, and the result serialized little-endian.
    #[inline(always)]
    pub(crate) fn keystream(&self) -> [u8; BLOCK_SIZE] {
        let mut x = self.clone();
        x.rounds();
        let mut dst = [0u8; BLOCK_SIZE];
        for (chunk, (x, y)) in zip(dst.chunks_exact_mut(4), zip(&x.0, &self.0))
        {
            LittleEndian::write_u32(chunk, x.wrapping_add(*y));
        }
        dst
    }

    /// Performs the 20 rounds.
    #[inline(always)]
    fn rounds(&mut self) {
        for _ in 0..10 {
            // Column round.
            self.qr(0, 4, 8, 12);
            self.qr(1, 5, 9, 13);
            self.qr(2, 6, 10, 14);
            self.qr(3, 7, 11, 15);
            // Diagonal round.
            self.qr(0, 5, 10, 15);
            self.qr(1, 6, 11, 12);
            self.qr(2, 7, 8, 13);
            self.qr(3, 4, 9, 14);
        }
    }

    /// Performs one quarter-round.
    #[inline(always)]
    fn qr(&mut self, a: usize, b: usize, c: usize, d: usize) {
        self[a] = self[a].wrapping_add(self[b]);
        self[d] = (self[d] ^ self[a]).rotate_left(16);
        self[c] = self[c].wrapping_add(self[d]);
        self[b] = (self[b] ^ self[c]).rotate_left(12);
        self[a] = self[a].wrapping_add(self[b]);
        self[d] = (self[d] ^ self[a]).rotate_left(8);
        self[c] = self[c].wrapping_add(self[d]);
        self[b] = (self[b] ^ self[c]).rotate_left(7);
    }

    #[inline(always)]
    pub(crate) fn incr_ctr(&mut self) {
        self[12] = self[12].wrapping_add(1);
    }
}

impl Deref for State {
    type Target = [u32; 16];

    fn deref(&self) -> &[u32; 16] {
        &self.0
    }
}

impl DerefMut for State {
    fn deref_mut(&mut self) -> &mut [u32; 16] {
        &mut self.0
    }
}
