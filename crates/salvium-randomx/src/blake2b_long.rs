//! Variable-length Blake2b expansion (Argon2's "H′"), used to derive the
//! first two blocks of the Argon2d cache and, in the VM, per-program
//! entropy. Matches the Argon2 specification bit-for-bit.

/// Standard Blake2b with the requested digest length (1..=64).
pub fn blake2b(data: &[u8], out_len: usize) -> Vec<u8> {
    blake2b_simd::Params::new()
        .hash_length(out_len)
        .hash(data)
        .as_bytes()
        .to_vec()
}

/// Blake2b-long ("H′" in the Argon2 spec): expand `input` into `out_len`
/// bytes.
///
/// If `out_len <= 64`, this is a single Blake2b call over
/// `(out_len as u32 LE) || input` with digest length `out_len`.
/// Otherwise it produces `ceil(out_len / 32) - 1` 32-byte chunks (the first
/// 32 bytes of successive 64-byte Blake2b digests, each re-hashing the
/// previous full 64-byte digest) followed by one final chunk of the
/// remaining length (which may be < 64).
pub fn blake2b_long(input: &[u8], out_len: usize) -> Vec<u8> {
    if out_len <= 64 {
        let mut prefixed = Vec::with_capacity(4 + input.len());
        prefixed.extend_from_slice(&(out_len as u32).to_le_bytes());
        prefixed.extend_from_slice(input);
        return blake2b(&prefixed, out_len);
    }

    let mut out = Vec::with_capacity(out_len);
    let mut prefixed = Vec::with_capacity(4 + input.len());
    prefixed.extend_from_slice(&(out_len as u32).to_le_bytes());
    prefixed.extend_from_slice(input);

    let mut v = blake2b(&prefixed, 64);
    out.extend_from_slice(&v[..32]);
    let mut remaining = out_len - 32;

    while remaining > 64 {
        v = blake2b(&v, 64);
        out.extend_from_slice(&v[..32]);
        remaining -= 32;
    }

    v = blake2b(&v, remaining);
    out.extend_from_slice(&v);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake2b_abc_standard_vector() {
        let hash = blake2b(b"abc", 32);
        let expected =
            hex::decode("ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d")
                .unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_blake2b_long_short_path_matches_direct_hash() {
        let a = blake2b_long(b"seed", 32);
        let mut prefixed = Vec::new();
        prefixed.extend_from_slice(&32u32.to_le_bytes());
        prefixed.extend_from_slice(b"seed");
        let b = blake2b(&prefixed, 32);
        assert_eq!(a, b);
    }

    #[test]
    fn test_blake2b_long_length_matches_request() {
        for len in [16usize, 64, 65, 128, 1024] {
            let out = blake2b_long(b"x", len);
            assert_eq!(out.len(), len);
        }
    }

    #[test]
    fn test_blake2b_long_deterministic() {
        let a = blake2b_long(b"determinism check", 1024);
        let b = blake2b_long(b"determinism check", 1024);
        assert_eq!(a, b);
    }
}
