//! Ed25519/X25519 field and group arithmetic, CryptoNote and CARROT key
//! derivation, CLSAG/T-CLSAG ring signatures, Bulletproofs+ range proofs,
//! and transaction (de)serialisation.
//!
//! Every crypto primitive is exposed both as a plain Rust function (used by
//! the wallet/tx crates) and, behind the `wasm-exports` feature, as a
//! `wasm_bindgen` export consumed by the JS-side wallet UI.

use wasm_bindgen::prelude::*;
use tiny_keccak::{Hasher, Keccak};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::traits::VartimeMultiscalarMul;

pub mod elligator2;
pub mod x25519;
pub mod clsag;
pub mod tclsag;
pub mod carrot_keys;
pub mod carrot_scan;
pub mod cn_scan;
pub mod subaddress;
pub mod bulletproofs_plus;
pub mod rct_verify;
pub mod tx_constants;
pub mod tx_format;
pub mod tx_parse;
pub mod tx_serialize;

#[cfg(not(target_arch = "wasm32"))]
pub mod storage;

/// Generator point `H` used by Pedersen commitments (`C = mask*G + amount*H`).
///
/// The canonical CryptoNote/Monero second generator, carried forward
/// unchanged by Salvium: `8 * elligator2(keccak256(G))`, precomputed here
/// as a constant since every commitment in the system uses it.
pub const H_POINT_BYTES: [u8; 32] = [
    0x8b, 0x65, 0x59, 0x70, 0x15, 0x37, 0x99, 0xaf,
    0x2a, 0xea, 0xdc, 0x9f, 0xf1, 0xad, 0xd0, 0xea,
    0x6c, 0x72, 0x51, 0xd5, 0x41, 0x54, 0xcf, 0xa9,
    0x2c, 0x17, 0x3a, 0x0d, 0xd3, 0x9c, 0x1f, 0x94,
];

/// Keccak-256 (CryptoNote variant — NOT SHA3 — used as the internal-only
/// fixed-array form; `keccak256` below is the `Vec<u8>` wasm-facing twin).
pub(crate) fn keccak256_internal(data: &[u8]) -> [u8; 32] {
    let mut keccak = Keccak::v256();
    let mut output = [0u8; 32];
    keccak.update(data);
    keccak.finalize(&mut output);
    output
}

/// Keccak-256 hash (CryptoNote variant with 0x01 padding, NOT SHA3)
/// Matches Salvium C++ cn_fast_hash / keccak()
#[wasm_bindgen]
pub fn keccak256(data: &[u8]) -> Vec<u8> {
    keccak256_internal(data).to_vec()
}

/// Blake2b with variable output length (unkeyed)
/// Matches Salvium C++ blake2b(out, outLen, data, dataLen, NULL, 0)
#[wasm_bindgen]
pub fn blake2b_hash(data: &[u8], out_len: usize) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// Blake2b with key (keyed variant per RFC 7693)
/// Matches Salvium C++ blake2b(out, outLen, data, dataLen, key, keyLen)
/// Used by CARROT protocol for domain-separated hashing
#[wasm_bindgen]
pub fn blake2b_keyed(data: &[u8], out_len: usize, key: &[u8]) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .key(key)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// Argon2id password hash used by the wallet-cache encryption layer
/// (distinct from RandomX's Argon2d cache, which is a fixed-parameter PoW
/// primitive implemented in the `salvium-randomx` crate).
#[cfg(not(target_arch = "wasm32"))]
pub fn argon2id_hash(password: &[u8], salt: &[u8], out_len: usize) -> Result<Vec<u8>, String> {
    use argon2::{Argon2, Algorithm, Version, Params};
    let params = Params::new(19456, 2, 1, Some(out_len))
        .map_err(|e| e.to_string())?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut out = vec![0u8; out_len];
    argon2
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

// ─── Helpers ────────────────────────────────────────────────────────────────

pub(crate) fn to32(s: &[u8]) -> [u8; 32] {
    let mut buf = [0u8; 32];
    let len = s.len().min(32);
    buf[..len].copy_from_slice(&s[..len]);
    buf
}

pub(crate) fn to64(s: &[u8]) -> [u8; 64] {
    let mut buf = [0u8; 64];
    let len = s.len().min(64);
    buf[..len].copy_from_slice(&s[..len]);
    buf
}

// ─── Scalar Operations (mod L) ─────────────────────────────────────────────

#[wasm_bindgen]
pub fn sc_add(a: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    (sa + sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_sub(a: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    (sa - sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    (sa * sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_mul_add(a: &[u8], b: &[u8], c: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    let sc = Scalar::from_bytes_mod_order(to32(c));
    (sa * sb + sc).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_mul_sub(a: &[u8], b: &[u8], c: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    let sc = Scalar::from_bytes_mod_order(to32(c));
    (sc - sa * sb).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_reduce32(s: &[u8]) -> Vec<u8> {
    Scalar::from_bytes_mod_order(to32(s)).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_reduce64(s: &[u8]) -> Vec<u8> {
    Scalar::from_bytes_mod_order_wide(&to64(s)).to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_invert(a: &[u8]) -> Vec<u8> {
    Scalar::from_bytes_mod_order(to32(a)).invert().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn sc_check(s: &[u8]) -> bool {
    bool::from(Scalar::from_canonical_bytes(to32(s)).is_some())
}

#[wasm_bindgen]
pub fn sc_is_zero(s: &[u8]) -> bool {
    Scalar::from_bytes_mod_order(to32(s)) == Scalar::ZERO
}

// ─── Point Operations (compressed Edwards) ──────────────────────────────────

#[wasm_bindgen]
pub fn scalar_mult_base(s: &[u8]) -> Vec<u8> {
    let scalar = Scalar::from_bytes_mod_order(to32(s));
    (ED25519_BASEPOINT_TABLE * &scalar).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn scalar_mult_point(s: &[u8], p: &[u8]) -> Vec<u8> {
    let scalar = Scalar::from_bytes_mod_order(to32(s));
    let point = CompressedEdwardsY(to32(p)).decompress().expect("invalid point");
    // Use variable-time Straus/wNAF — much faster than constant-time mul
    EdwardsPoint::vartime_multiscalar_mul(&[scalar], &[point])
        .compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn point_add_compressed(p: &[u8], q: &[u8]) -> Vec<u8> {
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point p");
    let qq = CompressedEdwardsY(to32(q)).decompress().expect("invalid point q");
    (pp + qq).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn point_sub_compressed(p: &[u8], q: &[u8]) -> Vec<u8> {
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point p");
    let qq = CompressedEdwardsY(to32(q)).decompress().expect("invalid point q");
    (pp - qq).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn point_negate(p: &[u8]) -> Vec<u8> {
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point");
    (-pp).compress().to_bytes().to_vec()
}

#[wasm_bindgen]
pub fn double_scalar_mult_base(a: &[u8], p: &[u8], b: &[u8]) -> Vec<u8> {
    let sa = Scalar::from_bytes_mod_order(to32(a));
    let sb = Scalar::from_bytes_mod_order(to32(b));
    let pp = CompressedEdwardsY(to32(p)).decompress().expect("invalid point");
    // Variable-time multi-scalar: a*P + b*G
    EdwardsPoint::vartime_multiscalar_mul(
        &[sa, sb],
        &[pp, curve25519_dalek::constants::ED25519_BASEPOINT_POINT],
    ).compress().to_bytes().to_vec()
}

/// `H_p(data)` — Monero/CryptoNote hash-to-point: Keccak-256, Elligator2,
/// cofactor multiplication by 8. Shared by CLSAG key images, CARROT's `T`
/// generator lookup, and legacy CryptoNote derivation.
pub fn hash_to_point(data: &[u8]) -> Vec<u8> {
    let hash = keccak256_internal(data);
    let point = elligator2::ge_fromfe_frombytes_vartime(&hash);
    let p2 = point + point;
    let p4 = p2 + p2;
    let p8 = p4 + p4;
    p8.compress().to_bytes().to_vec()
}

/// Pedersen commitment `C = mask*G + amount*H` (amount as 8-byte LE or a
/// reduced scalar — either form is accepted as the commitment's `a` input).
pub fn pedersen_commit(amount_le: &[u8], mask: &[u8; 32]) -> Vec<u8> {
    let amount_scalar = if amount_le.len() == 32 {
        Scalar::from_bytes_mod_order(to32(amount_le))
    } else {
        let mut buf = [0u8; 32];
        buf[..amount_le.len().min(32)].copy_from_slice(&amount_le[..amount_le.len().min(32)]);
        Scalar::from_bytes_mod_order(buf)
    };
    let mask_scalar = Scalar::from_bytes_mod_order(*mask);
    let h_point = CompressedEdwardsY(H_POINT_BYTES).decompress().expect("invalid H");
    EdwardsPoint::vartime_multiscalar_mul(
        &[mask_scalar, amount_scalar],
        &[curve25519_dalek::constants::ED25519_BASEPOINT_POINT, h_point],
    ).compress().to_bytes().to_vec()
}

/// Legacy CryptoNote key image: `I = x * H_p(P)`.
pub fn generate_key_image(pub_key: &[u8; 32], sec_key: &[u8; 32]) -> [u8; 32] {
    let hp = CompressedEdwardsY(to32(&hash_to_point(pub_key))).decompress().expect("invalid hp");
    let x = Scalar::from_bytes_mod_order(*sec_key);
    EdwardsPoint::vartime_multiscalar_mul(&[x], &[hp]).compress().to_bytes()
}

/// Legacy CryptoNote key derivation: `D = 8 * secret * pubkey`.
pub fn generate_key_derivation(secret: &[u8; 32], pubkey: &[u8; 32]) -> Option<[u8; 32]> {
    let p = CompressedEdwardsY(*pubkey).decompress()?;
    let s = Scalar::from_bytes_mod_order(*secret);
    let shared = EdwardsPoint::vartime_multiscalar_mul(&[s], &[p]);
    let d2 = shared + shared;
    let d4 = d2 + d2;
    let d8 = d4 + d4;
    Some(d8.compress().to_bytes())
}

fn cn_encode_varint(mut val: u32, buf: &mut Vec<u8>) {
    loop {
        let byte = (val & 0x7f) as u8;
        val >>= 7;
        if val == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

/// `H_s(derivation || varint(output_index))`, as 32 raw bytes (reduced mod L).
pub fn derivation_to_scalar_bytes(derivation: &[u8; 32], output_index: u32) -> [u8; 32] {
    let mut buf = Vec::with_capacity(40);
    buf.extend_from_slice(derivation);
    cn_encode_varint(output_index, &mut buf);
    let hash = keccak256_internal(&buf);
    Scalar::from_bytes_mod_order(hash).to_bytes()
}

/// Legacy CryptoNote one-time output key: `Ko = base + H_s(D || index)*G`.
pub fn derive_public_key(derivation: &[u8; 32], output_index: u32, base: &[u8; 32]) -> Option<[u8; 32]> {
    let base_pt = CompressedEdwardsY(*base).decompress()?;
    let scalar_bytes = derivation_to_scalar_bytes(derivation, output_index);
    let scalar = Scalar::from_bytes_mod_order(scalar_bytes);
    let offset = ED25519_BASEPOINT_TABLE * &scalar;
    Some((base_pt + offset).compress().to_bytes())
}

/// Convert an Edwards public key to its Montgomery u-coordinate for X25519.
pub fn edwards_to_montgomery_u(ed_point: &[u8; 32]) -> [u8; 32] {
    x25519::edwards_to_montgomery_u(ed_point)
}

/// X25519 scalar multiplication with Salvium's non-standard clamping:
/// only bit 255 is cleared; bits 0..2 are preserved and bit 254 is not
/// forced. See §4.7/§9 of the design notes for why this departs from
/// RFC 7748.
pub fn x25519_scalar_mult(scalar: &[u8; 32], u_coord: &[u8; 32]) -> Vec<u8> {
    let mut clamped = *scalar;
    clamped[31] &= 0x7f;
    x25519::montgomery_ladder(&clamped, u_coord).to_vec()
}

/// Input context for a RingCT transaction: `'R' || first_key_image` (33 B).
pub fn make_input_context_rct(first_key_image: &[u8; 32]) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(33);
    ctx.push(b'R');
    ctx.extend_from_slice(first_key_image);
    ctx
}

/// Input context for a coinbase transaction: `'C' || height_LE || zeros` (33 B).
pub fn make_input_context_coinbase(block_height: u64) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(33);
    ctx.push(b'C');
    ctx.extend_from_slice(&block_height.to_le_bytes());
    ctx.resize(33, 0);
    ctx
}

/// Parse a serialised transaction into its JSON representation.
pub fn parse_transaction_bytes(data: &[u8]) -> Result<String, String> {
    tx_parse::parse_transaction(data)
}

/// Parse a serialised block into its JSON representation.
pub fn parse_block_bytes(data: &[u8]) -> Result<String, String> {
    tx_parse::parse_block(data)
}

/// Serialise a transaction's JSON representation back into wire bytes.
pub fn serialize_transaction_json(json_str: &str) -> Result<Vec<u8>, String> {
    tx_serialize::serialize_transaction(json_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h_point_is_valid_point() {
        assert!(CompressedEdwardsY(H_POINT_BYTES).decompress().is_some());
    }

    #[test]
    fn test_keccak256_length() {
        let hash = keccak256(b"abc");
        assert_eq!(hash.len(), 32);
    }

    #[test]
    fn test_pedersen_commit_homomorphic() {
        let m1 = Scalar::from(7u64).to_bytes();
        let m2 = Scalar::from(11u64).to_bytes();
        let c1 = pedersen_commit(&5u64.to_le_bytes(), &m1);
        let c2 = pedersen_commit(&9u64.to_le_bytes(), &m2);
        let sum_direct = pedersen_commit(&14u64.to_le_bytes(), &(Scalar::from(7u64) + Scalar::from(11u64)).to_bytes());

        let p1 = CompressedEdwardsY(to32(&c1)).decompress().unwrap();
        let p2 = CompressedEdwardsY(to32(&c2)).decompress().unwrap();
        let psum = CompressedEdwardsY(to32(&sum_direct)).decompress().unwrap();
        assert_eq!((p1 + p2).compress(), psum.compress());
    }

    #[test]
    fn test_make_input_context_lengths() {
        assert_eq!(make_input_context_rct(&[0xAAu8; 32]).len(), 33);
        assert_eq!(make_input_context_coinbase(42).len(), 33);
    }

    #[test]
    fn test_derive_public_key_roundtrip_uses_same_scalar() {
        let derivation = [0x11u8; 32];
        let base = (ED25519_BASEPOINT_TABLE * &Scalar::from(3u64)).compress().to_bytes();
        let ko1 = derive_public_key(&derivation, 0, &base).unwrap();
        let ko2 = derive_public_key(&derivation, 0, &base).unwrap();
        assert_eq!(ko1, ko2);
        let ko3 = derive_public_key(&derivation, 1, &base).unwrap();
        assert_ne!(ko1, ko3);
    }
}
