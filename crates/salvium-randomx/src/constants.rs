//! Fixed sizing constants for the RandomX cache, dataset, scratchpad, and
//! VM, matching the published RandomX parameter set.

/// Size in bytes of one Argon2d memory block.
pub const ARGON2_BLOCK_SIZE: usize = 1024;

/// Number of Argon2d blocks making up the 256 MiB cache.
pub const ARGON2_MEMORY_BLOCKS: usize = 262_144;

/// Argon2d lane count (RandomX always uses a single lane).
pub const ARGON2_LANES: usize = 1;

/// Argon2d iteration (pass) count.
pub const ARGON2_ITERATIONS: u32 = 3;

/// Argon2d version byte (0x13 == v1.3).
pub const ARGON2_VERSION: u32 = 0x13;

/// Argon2d salt, per the RandomX spec.
pub const ARGON2_SALT: &[u8] = b"RandomX\x03";

/// Total cache size in bytes (256 MiB).
pub const CACHE_SIZE_BYTES: usize = ARGON2_BLOCK_SIZE * ARGON2_MEMORY_BLOCKS;

/// Granularity at which SuperscalarHash reads the cache (64-byte lines,
/// distinct from the 1024-byte Argon2d block size used during cache init).
pub const CACHE_LINE_SIZE: usize = 64;

/// Number of 64-byte lines in the cache.
pub const CACHE_LINE_COUNT: usize = CACHE_SIZE_BYTES / CACHE_LINE_SIZE;

/// Size in bytes of one dataset item.
pub const DATASET_ITEM_SIZE: usize = 64;

/// Total number of dataset items (≈2080 MiB / 64 B).
pub const DATASET_ITEM_COUNT: u64 = 34_078_719;

/// Per-hasher scratchpad size (2 MiB).
pub const SCRATCHPAD_SIZE: usize = 2_097_152;

/// Scratchpad address masks, corresponding to the simulated L1/L2/L3 cache
/// tiers a RandomX program is allowed to address into.
pub const SCRATCHPAD_L1_MASK: u64 = 16_384 - 64;
pub const SCRATCHPAD_L2_MASK: u64 = 262_144 - 64;
pub const SCRATCHPAD_L3_MASK: u64 = (SCRATCHPAD_SIZE as u64) - 64;

/// Programs executed per hash.
pub const PROGRAM_COUNT: usize = 8;

/// VM iterations executed per program.
pub const PROGRAM_ITERATIONS: usize = 2048;

/// Instructions per generated program.
pub const PROGRAM_SIZE: usize = 256;

/// Number of integer registers (r0..r7).
pub const REGISTERS_COUNT: usize = 8;

/// Number of each floating-point register group (f, e, a).
pub const FLOAT_REG_COUNT: usize = 4;

/// SuperscalarHash: target latency cycles before terminating generation.
pub const SUPERSCALAR_LATENCY_TARGET: u32 = 170;

/// SuperscalarHash: maximum instruction count per generated program.
pub const SUPERSCALAR_MAX_INSTRUCTIONS: usize = 512;

/// SuperscalarHash: cache accesses per dataset item.
pub const SUPERSCALAR_CACHE_ACCESSES: usize = 8;

/// Multiplier used to seed `r0` from the dataset item index:
/// `r0 = (itemNumber + 1) * SUPERSCALAR_MUL_0`.
pub const SUPERSCALAR_MUL_0: u64 = 6364136223846793005;

/// Per-item register seed constants (`r[k] = r0 XOR ADD[k]`), the RandomX
/// reference generator's `superscalarAdd1..7` table. `ADD[0]` is zero by
/// convention so `r0` itself is left unXORed — only `r1..r7` are offset
/// from it.
pub const SUPERSCALAR_ADD_CONSTANTS: [u64; 8] = [
    0x0000_0000_0000_0000,
    0x810a_978a_59f5_a1fc,
    0xa770_99df_38c2_d846,
    0x8126_b91c_bf22_495c,
    0x494d_2597_179f_8a62,
    0x9237_efb9_ceaa_ec0c,
    0x2f2a_5674_6ce6_2d78,
    0x8485_3bf7_b62c_e54e,
];
