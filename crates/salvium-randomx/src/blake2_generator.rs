//! Blake2b-based byte generator used to synthesise SuperscalarHash and VM
//! programs. Replaces the SHA-256 stand-in the original miner carried
//! (documented there as a deliberately temporary substitute): this is the
//! real generator, seeded from the cache/dataset key and a nonce, producing
//! a stream of pseudo-random bytes by repeatedly re-hashing its own
//! 64-byte internal buffer.

use crate::blake2b_long::blake2b;

pub struct Blake2Generator {
    data: [u8; 64],
    index: usize,
}

impl Blake2Generator {
    pub fn new(seed: &[u8], nonce: u32) -> Self {
        let mut data = [0u8; 64];
        let n = seed.len().min(60);
        data[..n].copy_from_slice(&seed[..n]);
        data[60..64].copy_from_slice(&nonce.to_le_bytes());
        // index == data.len() forces an immediate reseed on first byte pull.
        Blake2Generator { data, index: 64 }
    }

    fn refill_if_needed(&mut self, bytes_needed: usize) {
        if self.index + bytes_needed > self.data.len() {
            let digest = blake2b(&self.data, 64);
            self.data.copy_from_slice(&digest);
            self.index = 0;
        }
    }

    pub fn get_byte(&mut self) -> u8 {
        self.refill_if_needed(1);
        let b = self.data[self.index];
        self.index += 1;
        b
    }

    pub fn get_u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        for slot in &mut b {
            *slot = self.get_byte();
        }
        u32::from_le_bytes(b)
    }

    pub fn get_u64(&mut self) -> u64 {
        let lo = self.get_u32() as u64;
        let hi = self.get_u32() as u64;
        lo | (hi << 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_stream() {
        let mut a = Blake2Generator::new(b"key", 0);
        let mut b = Blake2Generator::new(b"key", 0);
        for _ in 0..200 {
            assert_eq!(a.get_byte(), b.get_byte());
        }
    }

    #[test]
    fn test_nonce_changes_stream() {
        let mut a = Blake2Generator::new(b"key", 0);
        let mut b = Blake2Generator::new(b"key", 1);
        let seq_a: Vec<u8> = (0..64).map(|_| a.get_byte()).collect();
        let seq_b: Vec<u8> = (0..64).map(|_| b.get_byte()).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn test_refill_crosses_buffer_boundary() {
        let mut g = Blake2Generator::new(b"boundary-test-seed", 7);
        let first_pass: Vec<u8> = (0..64).map(|_| g.get_byte()).collect();
        let second_pass: Vec<u8> = (0..64).map(|_| g.get_byte()).collect();
        assert_ne!(first_pass, second_pass);
    }
}
