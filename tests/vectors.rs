//! Test vectors from RFC 8439.
//!
//! These exercise the public surface end to end: the block
//! function through the stream cipher, Poly1305 tag generation,
//! one-time key derivation through the AEAD, and the sealed
//! envelope format. They must match the RFC bit for bit.

use chachapoly::{chacha20, constant_time, poly1305, ChaCha20, ChaCha20Poly1305, Error, Poly1305};

// Helper function to decode hex strings
fn decode_hex(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

const SUNSCREEN: &[u8] = b"Ladies and Gentlemen of the class of '99: \
    If I could offer you only one tip for the future, sunscreen would \
    be it.";

// ============================================================================
// RFC 8439 Section 2.3.2 / 2.4.2 (ChaCha20)
// ============================================================================

#[test]
fn test_chacha20_block_rfc8439() {
    // Section 2.3.2 - the serialized block at counter 1.
    let key = decode_hex("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
    let nonce = decode_hex("000000090000004a00000000");
    let expected = decode_hex(
        "10f1e7e4d13b5915500fdd1fa32071c4c7d1f4c733c068030422aa9ac3d46c4e\
         d2826446079faa0914c2d705d98b02a2b5129cd1de164eb9cbd083e8a2503c4e",
    );

    let mut keystream = vec![0u8; 64];
    chacha20::encrypt(&key, &nonce, 1, &mut keystream, &[0u8; 64]).unwrap();
    assert_eq!(keystream, expected);
}

#[test]
fn test_chacha20_block_zero_key() {
    // Appendix A.1, test vector 1.
    let expected = decode_hex(
        "76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7\
         da41597c5157488d7724e03fb8d84a376a43b8f41518a11cc387b669b2ee6586",
    );

    let mut keystream = vec![0u8; 64];
    chacha20::encrypt(&[0u8; 32], &[0u8; 12], 0, &mut keystream, &[0u8; 64]).unwrap();
    assert_eq!(keystream, expected);
}

#[test]
fn test_chacha20_encrypt_rfc8439() {
    // Section 2.4.2 - the sunscreen quote at counter 1.
    let key = decode_hex("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f");
    let nonce = decode_hex("000000000000004a00000000");
    let expected = decode_hex(
        "6e2e359a2568f98041ba0728dd0d6981e97e7aec1d4360c20a27afccfd9fae0b\
         f91b65c5524733ab8f593dabcd62b3571639d624e65152ab8f530c359f0861d8\
         07ca0dbf500d6a6156a38e088a22b65e52bc514d16ccf806818ce91ab7793736\
         5af90bbf74a35be6b40b8eedf2785e42874d",
    );

    let mut ciphertext = vec![0u8; SUNSCREEN.len()];
    chacha20::encrypt(&key, &nonce, 1, &mut ciphertext, SUNSCREEN).unwrap();
    assert_eq!(ciphertext, expected);

    let mut plaintext = vec![0u8; ciphertext.len()];
    chacha20::decrypt(&key, &nonce, 1, &mut plaintext, &ciphertext).unwrap();
    assert_eq!(plaintext, SUNSCREEN);
}

#[test]
fn test_chacha20_ietf_text_rfc8439() {
    // Appendix A.2, test vector 2: 375 bytes, counter 1.
    let mut key = [0u8; 32];
    key[31] = 0x01;
    let mut nonce = [0u8; 12];
    nonce[11] = 0x02;
    let plaintext: &[u8] = b"Any submission to the IETF intended by the \
        Contributor for publication as all or part of an IETF \
        Internet-Draft or RFC and any statement made within the context \
        of an IETF activity is considered an \"IETF Contribution\". Such \
        statements include oral statements in IETF sessions, as well as \
        written and electronic communications made at any time or place, \
        which are addressed to";
    let expected = decode_hex(
        "a3fbf07df3fa2fde4f376ca23e82737041605d9f4f4f57bd8cff2c1d4b7955ec\
         2a97948bd3722915c8f3d337f7d370050e9e96d647b7c39f56e031ca5eb6250d\
         4042e02785ececfa4b4bb5e8ead0440e20b6e8db09d881a7c6132f420e527950\
         42bdfa7773d8a9051447b3291ce1411c680465552aa6c405b7764d5e87bea85a\
         d00f8449ed8f72d0d662ab052691ca66424bc86d2df80ea41f43abf937d3259d\
         c4b2d0dfb48a6c9139ddd7f76966e928e635553ba76c5c879d7b35d49eb2e62b\
         0871cdac638939e25e8a1e0ef9d5280fa8ca328b351c3c765989cbcf3daa8b6c\
         cc3aaf9f3979c92b3720fc88dc95ed84a1be059c6499b9fda236e7e818b04b0b\
         c39c1e876b193bfe5569753f88128cc08aaa9b63d1a16f80ef2554d7189c411f\
         5869ca52c5b83fa36ff216b9c1d30062bebcfd2dc5bce0911934fda79a86f6e6\
         98ced759c3ff9b6477338f3da4f9cd8514ea9982ccafb341b2384dd902f3d1ab\
         7ac61dd29c6f21ba5b862f3730e37cfdc4fd806c22f221",
    );

    let mut ciphertext = vec![0u8; plaintext.len()];
    chacha20::encrypt(&key, &nonce, 1, &mut ciphertext, plaintext).unwrap();
    assert_eq!(ciphertext, expected);
}

#[test]
fn test_chacha20_jabberwocky_counter_42() {
    // Appendix A.2, test vector 3: an odd initial counter.
    let key = decode_hex("1c9240a5eb55d38af333888604f6b5f0473917c1402b80099dca5cbc207075c0");
    let mut nonce = [0u8; 12];
    nonce[11] = 0x02;
    let plaintext: &[u8] = b"'Twas brillig, and the slithy toves\n\
        Did gyre and gimble in the wabe:\n\
        All mimsy were the borogoves,\n\
        And the mome raths outgrabe.";
    let expected = decode_hex(
        "62e6347f95ed87a45ffae7426f27a1df5fb69110044c0d73118effa95b01e5cf\
         166d3df2d721caf9b21e5fb14c616871fd84c54f9d65b283196c7fe4f60553eb\
         f39c6402c42234e32a356b3e764312a61a5532055716ead6962568f87d3f3f77\
         04c6a8d1bcd1bf4d50d6154b6da731b187b58dfd728afa36757a797ac188d1",
    );

    let mut ciphertext = vec![0u8; plaintext.len()];
    chacha20::encrypt(&key, &nonce, 42, &mut ciphertext, plaintext).unwrap();
    assert_eq!(ciphertext, expected);
}

#[test]
fn test_chacha20_streaming_matches_one_shot() {
    let key = [0x42u8; 32];
    let nonce = [0x24u8; 12];
    let msg: Vec<u8> = (0..1500u32).map(|i| (i * 7) as u8).collect();

    let mut want = vec![0u8; msg.len()];
    chacha20::encrypt(&key, &nonce, 1, &mut want, &msg).unwrap();

    for size in [1, 7, 64, 65, 100] {
        let mut cipher = ChaCha20::new(&key, &nonce).unwrap();
        let mut got = vec![0u8; msg.len()];
        for (dst, src) in got.chunks_mut(size).zip(msg.chunks(size)) {
            cipher.xor(dst, src).unwrap();
        }
        assert_eq!(got, want, "chunk size {size}");
    }
}

// ============================================================================
// RFC 8439 Section 2.5.2 (Poly1305)
// ============================================================================

#[test]
fn test_poly1305_rfc8439() {
    let key = decode_hex("85d6be7857556d337f4452fe42d506a80103808afb0db2fd4abff6af4149f51b");
    let msg = b"Cryptographic Forum Research Group";
    let expected = decode_hex("a8061dc1305136c6c22b8baf0c0127a9");

    let tag = poly1305::compute_tag(&key, msg).unwrap();
    assert_eq!(tag.to_vec(), expected);

    assert!(poly1305::verify_tag(&key, msg, &tag).unwrap());

    let mut bad = tag;
    bad[0] ^= 0x01;
    assert!(!poly1305::verify_tag(&key, msg, &bad).unwrap());
}

#[test]
fn test_poly1305_incremental_matches_one_shot() {
    let key = decode_hex("85d6be7857556d337f4452fe42d506a80103808afb0db2fd4abff6af4149f51b");
    let msg: Vec<u8> = (0..333u32).map(|i| i as u8).collect();

    let want = poly1305::compute_tag(&key, &msg).unwrap();

    let mut mac = Poly1305::new(&key).unwrap();
    for chunk in msg.chunks(11) {
        mac.update(chunk);
    }
    assert_eq!(mac.finalize(), want);
}

// ============================================================================
// RFC 8439 Section 2.8.2 (AEAD)
// ============================================================================

#[test]
fn test_aead_seal_rfc8439() {
    let key = decode_hex("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f");
    let nonce = decode_hex("070000004041424344454647");
    let aad = decode_hex("50515253c0c1c2c3c4c5c6c7");
    let expected = decode_hex(
        "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d6\
         3dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b36\
         92ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc\
         3ff4def08e4b7a9de576d26586cec64b6116\
         1ae10b594f09e26a7e902ecbd0600691",
    );

    let aead = ChaCha20Poly1305::new(&key).unwrap();
    let mut envelope = vec![0u8; SUNSCREEN.len() + ChaCha20Poly1305::TAG_SIZE];
    aead.seal(&mut envelope, &nonce, SUNSCREEN, &aad).unwrap();
    assert_eq!(envelope, expected);
}

#[test]
fn test_aead_open_rfc8439() {
    let key = decode_hex("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f");
    let nonce = decode_hex("070000004041424344454647");
    let aad = decode_hex("50515253c0c1c2c3c4c5c6c7");
    let envelope = decode_hex(
        "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d6\
         3dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b36\
         92ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc\
         3ff4def08e4b7a9de576d26586cec64b6116\
         1ae10b594f09e26a7e902ecbd0600691",
    );

    let aead = ChaCha20Poly1305::new(&key).unwrap();
    let mut plaintext = vec![0u8; envelope.len() - ChaCha20Poly1305::TAG_SIZE];
    aead.open(&mut plaintext, &nonce, &envelope, &aad).unwrap();
    assert_eq!(plaintext, SUNSCREEN);
}

#[test]
fn test_aead_open_rejects_tampering() {
    let key = decode_hex("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f");
    let nonce = decode_hex("070000004041424344454647");
    let aad = decode_hex("50515253c0c1c2c3c4c5c6c7");

    let aead = ChaCha20Poly1305::new(&key).unwrap();
    let mut envelope = vec![0u8; SUNSCREEN.len() + ChaCha20Poly1305::TAG_SIZE];
    aead.seal(&mut envelope, &nonce, SUNSCREEN, &aad).unwrap();

    let mut plaintext = vec![0u8; SUNSCREEN.len()];

    // Flip a ciphertext bit, a tag bit, an AAD bit, and a nonce
    // bit in turn; every one must fail closed.
    let mut tampered = envelope.clone();
    tampered[40] ^= 0x04;
    assert_eq!(
        aead.open(&mut plaintext, &nonce, &tampered, &aad),
        Err(Error::Authentication)
    );

    let mut tampered = envelope.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x80;
    assert_eq!(
        aead.open(&mut plaintext, &nonce, &tampered, &aad),
        Err(Error::Authentication)
    );

    let mut bad_aad = aad.clone();
    bad_aad[0] ^= 0x01;
    assert_eq!(
        aead.open(&mut plaintext, &nonce, &envelope, &bad_aad),
        Err(Error::Authentication)
    );

    let mut bad_nonce = nonce.clone();
    bad_nonce[11] ^= 0x01;
    assert_eq!(
        aead.open(&mut plaintext, &bad_nonce, &envelope, &aad),
        Err(Error::Authentication)
    );

    // No plaintext may be produced on failure.
    assert_eq!(plaintext, vec![0u8; SUNSCREEN.len()]);
}

#[test]
fn test_aead_roundtrip_sizes() {
    let key = [0x0fu8; 32];
    let nonce = [0xf0u8; 12];
    let aead = ChaCha20Poly1305::new(&key).unwrap();

    // Lengths straddling the block and MAC padding boundaries.
    for len in [0, 1, 15, 16, 17, 63, 64, 65, 127, 128, 129, 1000] {
        let msg: Vec<u8> = (0..len as u32).map(|i| i as u8).collect();
        let aad = b"header";

        let mut envelope = vec![0u8; len + ChaCha20Poly1305::TAG_SIZE];
        aead.seal(&mut envelope, &nonce, &msg, aad).unwrap();
        assert_eq!(envelope.len(), msg.len() + 16);

        let mut plaintext = vec![0u8; len];
        aead.open(&mut plaintext, &nonce, &envelope, aad).unwrap();
        assert_eq!(plaintext, msg, "length {len}");
    }
}

#[test]
fn test_aead_empty_everything() {
    let aead = ChaCha20Poly1305::new(&[0u8; 32]).unwrap();

    let mut envelope = [0u8; 16];
    aead.seal(&mut envelope, &[0u8; 12], &[], &[]).unwrap();

    let mut empty = [0u8; 0];
    aead.open(&mut empty, &[0u8; 12], &envelope, &[]).unwrap();
}

#[test]
fn test_aead_error_taxonomy() {
    assert_eq!(ChaCha20Poly1305::new(&[0u8; 16]).err(), Some(Error::InvalidKey));
    assert_eq!(Poly1305::new(&[0u8; 16]).err(), Some(Error::InvalidMacKey));
    assert_eq!(
        ChaCha20::new(&[0u8; 32], &[0u8; 24]).err(),
        Some(Error::InvalidNonce)
    );

    let aead = ChaCha20Poly1305::new(&[0u8; 32]).unwrap();
    let mut dst = [0u8; 0];
    assert_eq!(
        aead.open(&mut dst, &[0u8; 12], &[0u8; 15], &[]),
        Err(Error::InvalidEnvelope)
    );

    // A stream that would exhaust the 32-bit counter space is
    // refused up front.
    let mut cipher = ChaCha20::new_with_ctr(&[0u8; 32], &[0u8; 12], u32::MAX).unwrap();
    let mut buf = [0u8; 128];
    assert_eq!(cipher.xor_in_place(&mut buf), Err(Error::MessageTooLong));
}

// ============================================================================
// Constant-time comparison
// ============================================================================

#[test]
fn test_constant_time_comparison() {
    let a = [0x42u8; 32];
    let b = [0x42u8; 32];
    let c = [0x43u8; 32];

    assert!(constant_time::ct_eq(&a, &b));
    assert!(!constant_time::ct_eq(&a, &c));
    assert!(!constant_time::ct_eq(&a, &b[..16]));

    let t1 = [0x11u8; 16];
    let mut t2 = t1;
    assert!(constant_time::verify_16(&t1, &t2));
    t2[3] ^= 0x20;
    assert!(!constant_time::verify_16(&t1, &t2));
}
