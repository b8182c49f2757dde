//! The ChaCha20-Poly1305 AEAD.
//!
//! [ChaCha20-Poly1305] is an Authenticated Encryption with
//! Associated Data (AEAD) construction combining the ChaCha20
//! stream cipher with the Poly1305 one-time authenticator. It
//! takes a 256-bit key and a 96-bit nonce, encrypts a message of
//! up to about 256 GiB, and authenticates the ciphertext together
//! with optional additional data that is not encrypted.
//!
//! This crate implements the cipher, the authenticator, and the
//! AEAD from RFC 8439, including the derivation of the
//! one-time Poly1305 key from the cipher's block function and the
//! constant-time tag check. Each piece is also usable on its own:
//! [`chacha20`] for the unauthenticated stream cipher and
//! [`poly1305`] for the one-time authenticator.
//!
//! # Warning
//!
//! A nonce must never be used twice with the same key. Doing so
//! reveals the XOR of the two plaintexts and allows forgeries;
//! the construction has no nonce-misuse resistance whatsoever.
//!
//! [ChaCha20-Poly1305]: https://datatracker.ietf.org/doc/html/rfc8439

#![cfg_attr(docs, feature(doc_cfg))]
#![cfg_attr(feature = "error_in_core", feature(error_in_core))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::implicit_saturating_sub,
    clippy::panic,
    clippy::unwrap_used,
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications
)]
#![forbid(unsafe_code)]

/// Like [`assert!`], but forces a compile-time error.
macro_rules! const_assert {
    ($($tt:tt)*) => {
        const _: () = assert!($($tt)*);
    }
}
// In order to support, e.g., 16-bit CPUs we'll need to rethink
// how we compute some of the constants.
const_assert!(size_of::<usize>() >= 4);

pub mod chacha20;
pub mod constant_time;
pub mod poly1305;

use {
    byteorder::{ByteOrder, LittleEndian},
    cfg_if::cfg_if,
    core::{fmt, result::Result},
    zeroize::{Zeroize, ZeroizeOnDrop},
};

pub use crate::{chacha20::ChaCha20, poly1305::Poly1305};

use crate::chacha20::State;

cfg_if! {
    if #[cfg(feature = "error_in_core")] {
        use core::error;
    } else if #[cfg(feature = "std")] {
        use std::error;
    }
}

/// An error returned by this crate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The key is not exactly [`KEY_SIZE`] octets.
    InvalidKey,
    /// The nonce is not exactly 12 octets.
    InvalidNonce,
    /// The Poly1305 one-time key is not exactly 32 octets.
    InvalidMacKey,
    /// The message does not fit in the cipher's 32-bit block
    /// counter space.
    MessageTooLong,
    /// The AEAD input is shorter than an authentication tag.
    InvalidEnvelope,
    /// The output buffer is too small.
    BufferTooSmall,
    /// The message could not be authenticated.
    Authentication,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid key length"),
            Self::InvalidNonce => write!(f, "invalid nonce length"),
            Self::InvalidMacKey => {
                write!(f, "invalid one-time key length")
            }
            Self::MessageTooLong => write!(f, "message too long"),
            Self::InvalidEnvelope => {
                write!(f, "input shorter than an authentication tag")
            }
            Self::BufferTooSmall => write!(f, "output buffer too small"),
            Self::Authentication => write!(f, "message authentication failure"),
        }
    }
}

#[cfg_attr(docs, doc(cfg(any(feature = "error_in_core", feature = "std"))))]
#[cfg(any(feature = "error_in_core", feature = "std"))]
impl error::Error for Error {}

/// The size in octets of a ChaCha20 block.
pub const BLOCK_SIZE: usize = 64;

/// The size in octets of a key.
pub const KEY_SIZE: usize = 32;

/// The ChaCha20-Poly1305 AEAD.
#[derive(ZeroizeOnDrop)]
pub struct ChaCha20Poly1305([u8; KEY_SIZE]);

impl ChaCha20Poly1305 {
    /// The size in octets of a nonce.
    pub const NONCE_SIZE: usize = chacha20::NONCE_SIZE;

    /// The size in octets of an authentication tag.
    pub const TAG_SIZE: usize = poly1305::TAG_SIZE;

    /// The maximum size in octets of a plaintext.
    pub const P_MAX: u64 = (1 << 38) - 64;

    /// The maximum size in octets of a ciphertext, including the
    /// authentication tag.
    pub const C_MAX: u64 = Self::P_MAX + Self::TAG_SIZE as u64;

    /// The maximum size in octets of additional data.
    ///
    /// Only the low 64 bits of the length are authenticated, so
    /// this is the entire range of `u64`.
    pub const A_MAX: u64 = u64::MAX;

    /// Creates an instance of the AEAD.
    ///
    /// The key must be exactly [`KEY_SIZE`] octets.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let key = key.try_into().map_err(|_| Error::InvalidKey)?;
        Ok(Self(key))
    }

    /// Encrypts and authenticates `plaintext`, writing the
    /// ciphertext followed by the authentication tag to `dst`.
    ///
    /// # Requirements
    ///
    /// - `dst` must be at least [`TAG_SIZE`][Self::TAG_SIZE]
    ///   octets longer than `plaintext`.
    /// - `nonce` must be exactly
    ///   [`NONCE_SIZE`][Self::NONCE_SIZE] octets.
    /// - `plaintext` must be at most [`P_MAX`][Self::P_MAX]
    ///   octets long.
    #[inline]
    pub fn seal(
        &self,
        dst: &mut [u8],
        nonce: &[u8],
        plaintext: &[u8],
        additional_data: &[u8],
    ) -> Result<(), Error> {
        if plaintext.len() as u64 > Self::P_MAX {
            return Err(Error::MessageTooLong);
        }
        // This will not overflow since `plaintext.len()` is at
        // most `P_MAX` and `P_MAX` + `TAG_SIZE` will not
        // overflow.
        if dst.len() < plaintext.len() + Self::TAG_SIZE {
            return Err(Error::BufferTooSmall);
        }

        let (dst, rest) = dst.split_at_mut(plaintext.len());
        let tag = &mut rest[..Self::TAG_SIZE];
        self.seal_scatter(
            dst,
            tag.try_into().expect("bug: incorrect tag size"),
            nonce,
            plaintext,
            additional_data,
        )
    }

    /// Decrypts and authenticates `ciphertext`, whose final
    /// [`TAG_SIZE`][Self::TAG_SIZE] octets are the authentication
    /// tag, writing the plaintext to `dst`.
    ///
    /// On authentication failure nothing is written to `dst`.
    ///
    /// # Requirements
    ///
    /// - `dst` must be at least `ciphertext.len()` -
    ///   [`TAG_SIZE`][Self::TAG_SIZE] octets long.
    /// - `nonce` must be exactly
    ///   [`NONCE_SIZE`][Self::NONCE_SIZE] octets.
    /// - `ciphertext` must be at most [`C_MAX`][Self::C_MAX]
    ///   octets long.
    #[inline]
    pub fn open(
        &self,
        dst: &mut [u8],
        nonce: &[u8],
        ciphertext: &[u8],
        additional_data: &[u8],
    ) -> Result<(), Error> {
        if ciphertext.len() < Self::TAG_SIZE {
            return Err(Error::InvalidEnvelope);
        }
        if ciphertext.len() as u64 > Self::C_MAX {
            return Err(Error::MessageTooLong);
        }
        // Cannot overflow since `ciphertext` is at least
        // `TAG_SIZE` octets long.
        if dst.len() < ciphertext.len() - Self::TAG_SIZE {
            return Err(Error::BufferTooSmall);
        }

        let (ciphertext, tag) =
            ciphertext.split_at(ciphertext.len() - Self::TAG_SIZE);
        self.open_gather(
            dst,
            tag.try_into().expect("bug: incorrect tag size"),
            nonce,
            ciphertext,
            additional_data,
        )
    }

    /// Encrypts and authenticates `plaintext`.
    ///
    /// The ciphertext is written to `dst` and the authentication
    /// tag is written to `tag`.
    ///
    /// # Requirements
    ///
    /// - `dst` must be at least as long as `plaintext`.
    /// - `nonce` must be exactly
    ///   [`NONCE_SIZE`][Self::NONCE_SIZE] octets.
    /// - `plaintext` must be at most [`P_MAX`][Self::P_MAX]
    ///   octets long.
    pub fn seal_scatter(
        &self,
        dst: &mut [u8],
        tag: &mut [u8; poly1305::TAG_SIZE],
        nonce: &[u8],
        plaintext: &[u8],
        additional_data: &[u8],
    ) -> Result<(), Error> {
        if dst.len() < plaintext.len() {
            return Err(Error::BufferTooSmall);
        }
        if plaintext.len() as u64 > Self::P_MAX {
            return Err(Error::MessageTooLong);
        }

        let key = chacha20::key_words(&self.0)?;
        let nonce = chacha20::nonce_words(nonce)?;

        let mut mac = {
            let mut poly_key = poly1305_key(&key, &nonce);
            let mac = Poly1305::new(&poly_key)?;
            poly_key.zeroize();
            mac
        };

        let mut s = ChaCha20::from_words(key, nonce, 1);
        s.xor(&mut dst[..plaintext.len()], plaintext)?;

        mac.update_padded(additional_data);
        mac.update_padded(&dst[..plaintext.len()]);
        mac.update(&lengths(additional_data.len(), plaintext.len()));
        tag.copy_from_slice(&mac.finalize());

        Ok(())
    }

    /// Decrypts and authenticates `ciphertext` against the
    /// detached authentication tag `tag`.
    ///
    /// The plaintext is written to `dst`. On authentication
    /// failure nothing is written to `dst`.
    ///
    /// # Requirements
    ///
    /// - `dst` must be at least as long as `ciphertext`.
    /// - `nonce` must be exactly
    ///   [`NONCE_SIZE`][Self::NONCE_SIZE] octets.
    /// - `ciphertext` must be at most [`C_MAX`][Self::C_MAX] -
    ///   [`TAG_SIZE`][Self::TAG_SIZE] octets long.
    pub fn open_gather(
        &self,
        dst: &mut [u8],
        tag: &[u8; poly1305::TAG_SIZE],
        nonce: &[u8],
        ciphertext: &[u8],
        additional_data: &[u8],
    ) -> Result<(), Error> {
        if dst.len() < ciphertext.len() {
            return Err(Error::BufferTooSmall);
        }
        if ciphertext.len() as u64 > Self::P_MAX {
            return Err(Error::MessageTooLong);
        }

        let key = chacha20::key_words(&self.0)?;
        let nonce = chacha20::nonce_words(nonce)?;

        let mut mac = {
            let mut poly_key = poly1305_key(&key, &nonce);
            let mac = Poly1305::new(&poly_key)?;
            poly_key.zeroize();
            mac
        };
        mac.update_padded(additional_data);
        mac.update_padded(ciphertext);
        mac.update(&lengths(additional_data.len(), ciphertext.len()));
        mac.verify(tag)?;

        ChaCha20::from_words(key, nonce, 1).xor(dst, ciphertext)
    }
}

/// Derives the Poly1305 one-time key for (key, nonce).
///
/// The first 32 octets of the block function's output at counter
/// zero become the one-time key; the rest of the block is
/// discarded.
fn poly1305_key(key: &[u32; 8], nonce: &[u32; 3]) -> [u8; 32] {
    let mut block = State::new(key, 0, nonce).keystream();
    let mut out = [0u8; 32];
    out.copy_from_slice(&block[..32]);
    block.zeroize();
    out
}

/// Encodes the lengths of the additional data and the ciphertext
/// as the final block of the authenticator's input.
fn lengths(ad: usize, ct: usize) -> [u8; 16] {
    let mut out = [0u8; 16];
    LittleEndian::write_u64(&mut out[0..8], ad as u64);
    LittleEndian::write_u64(&mut out[8..16], ct as u64);
    out
}
