//! Argon2d-RandomX: the memory-hard cache initialiser.
//!
//! Fixed parameters per the RandomX spec: type = Argon2d, version = 0x13,
//! lanes = 1, iterations = 3, memory = 262144 KiB, salt = `"RandomX\x03"`,
//! no secret, no associated data, tag length = 0. Password is the 32-byte
//! seed key supplied by the caller.
//!
//! Single-lane Argon2d collapses the reference algorithm's cross-lane
//! reference-index branches to dead code (`same_lane` is always true), so
//! this implementation only carries the same-lane formula. See DESIGN.md
//! for why the suspicious `index == 0` collapsing expression the original
//! source used for the cross-lane case was reconstructed rather than
//! ported.

use crate::blake2b_long::{blake2b, blake2b_long};
use crate::constants::*;

/// One 1024-byte Argon2 memory block, viewed as 128 little-endian u64 words.
pub type Block = [u64; 128];

const SYNC_POINTS: usize = 4;

fn block_from_bytes(bytes: &[u8]) -> Block {
    let mut block = [0u64; 128];
    for (i, word) in block.iter_mut().enumerate() {
        let mut b = [0u8; 8];
        b.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
        *word = u64::from_le_bytes(b);
    }
    block
}

fn fblamka(x: u64, y: u64) -> u64 {
    let xy = (x & 0xFFFF_FFFF).wrapping_mul(y & 0xFFFF_FFFF);
    x.wrapping_add(y).wrapping_add(2u64.wrapping_mul(xy))
}

fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize) {
    v[a] = fblamka(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = fblamka(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = fblamka(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = fblamka(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

fn blake2_round_nomsg(v: &mut [u64; 16]) {
    g(v, 0, 4, 8, 12);
    g(v, 1, 5, 9, 13);
    g(v, 2, 6, 10, 14);
    g(v, 3, 7, 11, 15);
    g(v, 0, 5, 10, 15);
    g(v, 1, 6, 11, 12);
    g(v, 2, 7, 8, 13);
    g(v, 3, 4, 9, 14);
}

/// Apply the BlaMka permutation to the 8 rows, then the 8 columns, of a
/// 1024-byte (128 x u64) block.
fn permute_block(block: &mut Block) {
    for i in 0..8 {
        let mut window: [u64; 16] = block[16 * i..16 * i + 16].try_into().unwrap();
        blake2_round_nomsg(&mut window);
        block[16 * i..16 * i + 16].copy_from_slice(&window);
    }
    for i in 0..8 {
        let idx = [
            2 * i, 2 * i + 1,
            2 * i + 16, 2 * i + 17,
            2 * i + 32, 2 * i + 33,
            2 * i + 48, 2 * i + 49,
            2 * i + 64, 2 * i + 65,
            2 * i + 80, 2 * i + 81,
            2 * i + 96, 2 * i + 97,
            2 * i + 112, 2 * i + 113,
        ];
        let mut window = [0u64; 16];
        for (k, &j) in idx.iter().enumerate() {
            window[k] = block[j];
        }
        blake2_round_nomsg(&mut window);
        for (k, &j) in idx.iter().enumerate() {
            block[j] = window[k];
        }
    }
}

/// `G(X, Y)`: R = X xor Y, permute R row-wise then column-wise, return
/// `R xor permute(R)`, optionally also xor'd into the existing destination
/// (pass > 0 semantics).
fn fill_block(prev: &Block, refb: &Block, next: &mut Block, with_xor: bool) {
    let mut r = [0u64; 128];
    for i in 0..128 {
        r[i] = prev[i] ^ refb[i];
    }
    let mut tmp = r;
    permute_block(&mut tmp);
    if with_xor {
        for i in 0..128 {
            next[i] ^= tmp[i] ^ r[i];
        }
    } else {
        for i in 0..128 {
            next[i] = tmp[i] ^ r[i];
        }
    }
}

fn initial_hash(password: &[u8]) -> [u8; 64] {
    let mut buf = Vec::with_capacity(64 + password.len() + ARGON2_SALT.len());
    buf.extend_from_slice(&(ARGON2_LANES as u32).to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // tag length = 0
    buf.extend_from_slice(&(ARGON2_MEMORY_BLOCKS as u32).to_le_bytes());
    buf.extend_from_slice(&ARGON2_ITERATIONS.to_le_bytes());
    buf.extend_from_slice(&ARGON2_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // type = Argon2d
    buf.extend_from_slice(&(password.len() as u32).to_le_bytes());
    buf.extend_from_slice(password);
    buf.extend_from_slice(&(ARGON2_SALT.len() as u32).to_le_bytes());
    buf.extend_from_slice(ARGON2_SALT);
    buf.extend_from_slice(&0u32.to_le_bytes()); // secret length = 0
    buf.extend_from_slice(&0u32.to_le_bytes()); // associated data length = 0

    let h0 = blake2b(&buf, 64);
    let mut out = [0u8; 64];
    out.copy_from_slice(&h0);
    out
}

/// Same-lane Argon2 reference-index formula (RFC 9106 §3.4), specialised
/// to a single lane: the cross-lane branch never executes.
fn index_alpha(pass: u32, slice: usize, idx: usize, segment_length: usize, lane_length: usize, j1: u32) -> usize {
    let reference_area_size: u64 = if pass == 0 {
        if slice == 0 {
            (idx as u64).wrapping_sub(1)
        } else {
            (slice * segment_length + idx) as u64 - 1
        }
    } else {
        (lane_length - segment_length + idx) as u64 - 1
    };

    let mut relative_position = j1 as u64;
    relative_position = (relative_position * relative_position) >> 32;
    relative_position = reference_area_size - 1 - ((reference_area_size * relative_position) >> 32);

    let start_position: u64 = if pass != 0 {
        if slice == SYNC_POINTS - 1 {
            0
        } else {
            ((slice + 1) * segment_length) as u64
        }
    } else {
        0
    };

    ((start_position + relative_position) % lane_length as u64) as usize
}

/// 256 MiB Argon2d cache: 262144 1024-byte blocks, derived once from a
/// 32-byte seed key and shared read-only thereafter.
pub struct Cache {
    pub blocks: Vec<Block>,
    pub key: [u8; 32],
}

impl Cache {
    /// Read a 64-byte cache line (SuperscalarHash's access granularity,
    /// distinct from the 1024-byte Argon2 block size).
    pub fn read_line(&self, line_index: u64) -> [u8; 64] {
        let line_index = (line_index as usize) % CACHE_LINE_COUNT;
        let block_idx = line_index / (ARGON2_BLOCK_SIZE / CACHE_LINE_SIZE);
        let offset_in_block = line_index % (ARGON2_BLOCK_SIZE / CACHE_LINE_SIZE);
        let word_offset = offset_in_block * (CACHE_LINE_SIZE / 8);
        let mut out = [0u8; 64];
        for i in 0..8 {
            out[i * 8..i * 8 + 8].copy_from_slice(&self.blocks[block_idx][word_offset + i].to_le_bytes());
        }
        out
    }
}

/// Initialise the 256 MiB Argon2d cache from a 32-byte seed key. This
/// blocks the caller for several seconds and is expected to run on a
/// background thread; see [`init_cache_with_progress`] for a cancellable,
/// progress-reporting variant.
pub fn init_cache(key: &[u8]) -> Cache {
    init_cache_with_progress(key, |_done, _total| {}, &std::sync::atomic::AtomicBool::new(false))
}

/// Same as [`init_cache`] but reports progress (in blocks filled) and
/// honours cooperative cancellation, checked once per segment boundary.
pub fn init_cache_with_progress(
    key: &[u8],
    mut progress: impl FnMut(usize, usize),
    cancel: &std::sync::atomic::AtomicBool,
) -> Cache {
    let h0 = initial_hash(key);

    let lane_length = ARGON2_MEMORY_BLOCKS;
    let segment_length = lane_length / SYNC_POINTS;

    let mut blocks: Vec<Block> = vec![[0u64; 128]; lane_length];

    let mut seed0 = Vec::with_capacity(72);
    seed0.extend_from_slice(&h0);
    seed0.extend_from_slice(&0u32.to_le_bytes());
    seed0.extend_from_slice(&0u32.to_le_bytes());
    blocks[0] = block_from_bytes(&blake2b_long(&seed0, ARGON2_BLOCK_SIZE));

    let mut seed1 = Vec::with_capacity(72);
    seed1.extend_from_slice(&h0);
    seed1.extend_from_slice(&1u32.to_le_bytes());
    seed1.extend_from_slice(&0u32.to_le_bytes());
    blocks[1] = block_from_bytes(&blake2b_long(&seed1, ARGON2_BLOCK_SIZE));

    let total_fills = lane_length * ARGON2_ITERATIONS as usize;
    let mut done = 0usize;

    for pass in 0..ARGON2_ITERATIONS {
        for slice in 0..SYNC_POINTS {
            if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                return Cache { blocks, key: key_array(key) };
            }
            for idx in 0..segment_length {
                let absolute_index = slice * segment_length + idx;
                if pass == 0 && absolute_index < 2 {
                    continue;
                }
                let prev_index = if absolute_index == 0 { lane_length - 1 } else { absolute_index - 1 };
                let j1 = (blocks[prev_index][0] & 0xFFFF_FFFF) as u32;
                let ref_index = index_alpha(pass, slice, idx, segment_length, lane_length, j1);

                let prev = blocks[prev_index];
                let refb = blocks[ref_index];
                let with_xor = pass > 0;
                fill_block(&prev, &refb, &mut blocks[absolute_index], with_xor);

                done += 1;
            }
            progress(done, total_fills);
        }
    }

    Cache { blocks, key: key_array(key) }
}

fn key_array(key: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let len = key.len().min(32);
    out[..len].copy_from_slice(&key[..len]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_size() {
        let cache = init_cache(b"test key 000");
        assert_eq!(cache.blocks.len(), ARGON2_MEMORY_BLOCKS);
    }

    #[test]
    fn test_cache_deterministic() {
        let a = init_cache(b"determinism");
        let b = init_cache(b"determinism");
        assert_eq!(a.blocks[0], b.blocks[0]);
        assert_eq!(a.blocks[100], b.blocks[100]);
    }

    #[test]
    fn test_cache_different_keys_diverge() {
        let a = init_cache(b"key-a");
        let b = init_cache(b"key-b");
        assert_ne!(a.blocks[2], b.blocks[2]);
    }

    #[test]
    fn test_index_alpha_stays_in_bounds() {
        let lane_length = ARGON2_MEMORY_BLOCKS;
        let segment_length = lane_length / SYNC_POINTS;
        for pass in 0..3u32 {
            for slice in 0..4usize {
                for idx in [0usize, 1, segment_length - 1] {
                    if pass == 0 && slice == 0 && idx < 2 {
                        continue;
                    }
                    let r = index_alpha(pass, slice, idx, segment_length, lane_length, 0xDEADBEEF);
                    assert!(r < lane_length);
                }
            }
        }
    }

    #[test]
    #[ignore] // full 256 MiB Argon2d cache init, validated against the published
              // RandomX test vector: first u64 of block 0 after 3 passes.
    fn test_argon2d_randomx_published_vector() {
        let cache = init_cache(b"test key 000");
        assert_eq!(cache.blocks[0][0], 0x191e_0e1d_23c0_2186);
    }
}
