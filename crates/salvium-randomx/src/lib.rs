//! Pure-Rust RandomX proof-of-work engine: Argon2d cache initialisation,
//! SuperscalarHash dataset expansion, a soft-AES scratchpad pipeline, and
//! the bytecode VM, wired together behind a small light/full mode API.
//!
//! Light mode keeps only the 256 MiB cache resident and computes dataset
//! items on demand via SuperscalarHash; full mode additionally builds the
//! ~2080 MiB dataset once and shares it read-only across hasher
//! instances, trading memory and a one-time build cost for throughput.

pub mod aes;
pub mod argon2d;
pub mod blake2_generator;
pub mod blake2b_long;
pub mod constants;
pub mod hasher;
pub mod superscalar;
pub mod vm;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use argon2d::Cache;
use constants::DATASET_ITEM_COUNT;
use vm::DatasetSource;

/// Cache-backed dataset access: each item is computed on demand via
/// SuperscalarHash. Cheap to construct, slower per-hash than full mode.
pub struct LightDataset {
    cache: Arc<Cache>,
}

impl DatasetSource for LightDataset {
    fn get_item(&self, index: u64) -> [u8; 64] {
        superscalar::generate_dataset_item(&self.cache, index)
    }
}

/// Fully expanded dataset: every item precomputed and held in memory.
pub struct FullDataset {
    items: Vec<[u8; 64]>,
}

impl DatasetSource for FullDataset {
    fn get_item(&self, index: u64) -> [u8; 64] {
        if self.items.is_empty() {
            return [0u8; 64];
        }
        // `items.len()` can be shorter than `DATASET_ITEM_COUNT` if `build`
        // observed cancellation mid-expansion; index modulo the real length
        // keeps this in bounds instead of panicking on a truncated dataset.
        self.items[(index % self.items.len() as u64) as usize]
    }
}

impl FullDataset {
    /// Expand the entire dataset from `cache`. This touches ~2080 MiB and
    /// runs `DATASET_ITEM_COUNT` SuperscalarHash programs; run it on a
    /// background thread and poll `cancel` if the caller needs to abort.
    pub fn build(cache: &Cache, mut progress: impl FnMut(u64, u64), cancel: &AtomicBool) -> Self {
        let total = DATASET_ITEM_COUNT;
        let mut items = Vec::with_capacity(total as usize);
        for i in 0..total {
            if i % 65536 == 0 {
                if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                    break;
                }
                progress(i, total);
            }
            items.push(superscalar::generate_dataset_item(cache, i));
        }
        FullDataset { items }
    }
}

/// Which dataset backing a [`Hasher`] uses.
#[derive(Clone, Copy)]
pub enum Mode {
    Light,
    Full,
}

/// A RandomX hasher bound to a specific key (the per-epoch seed hash).
/// Cheap to clone the `Arc`-shared cache/dataset across worker threads;
/// each thread should own its own `Hasher` for its private scratchpad.
pub struct Hasher {
    dataset: Arc<dyn DatasetSource + Send + Sync>,
    mode: Mode,
}

impl Hasher {
    /// Build a light-mode hasher: initialises the 256 MiB cache from
    /// `key` and computes dataset items on demand.
    pub fn new_light(key: &[u8]) -> Self {
        let cache = Arc::new(argon2d::init_cache(key));
        Hasher {
            dataset: Arc::new(LightDataset { cache }),
            mode: Mode::Light,
        }
    }

    /// Build a full-mode hasher: initialises the cache then eagerly
    /// expands the entire dataset. Expensive; prefer sharing the result
    /// via [`Hasher::from_shared_dataset`] across multiple mining threads.
    pub fn new_full(key: &[u8]) -> Self {
        let cache = argon2d::init_cache(key);
        let dataset = FullDataset::build(&cache, |_, _| {}, &AtomicBool::new(false));
        Hasher {
            dataset: Arc::new(dataset),
            mode: Mode::Full,
        }
    }

    /// Share an already-built dataset (light or full) across hashers,
    /// e.g. one per mining thread, without recomputing it.
    pub fn from_shared_dataset(dataset: Arc<dyn DatasetSource + Send + Sync>, mode: Mode) -> Self {
        Hasher { dataset, mode }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Compute the 32-byte RandomX hash of `input`.
    pub fn hash(&self, input: &[u8]) -> [u8; 32] {
        hasher::hash(input, self.dataset.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_hasher_deterministic() {
        let h = Hasher::new_light(b"epoch-seed");
        let a = h.hash(b"nonce-1");
        let b = h.hash(b"nonce-1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_light_hasher_varies_with_input() {
        let h = Hasher::new_light(b"epoch-seed");
        let a = h.hash(b"nonce-1");
        let b = h.hash(b"nonce-2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_light_hasher_varies_with_key() {
        let a = Hasher::new_light(b"epoch-seed-a").hash(b"nonce-1");
        let b = Hasher::new_light(b"epoch-seed-b").hash(b"nonce-1");
        assert_ne!(a, b);
    }

    #[test]
    fn test_shared_dataset_across_hashers() {
        let cache = Arc::new(argon2d::init_cache(b"shared-epoch"));
        let dataset: Arc<dyn DatasetSource + Send + Sync> = Arc::new(LightDataset { cache });
        let h1 = Hasher::from_shared_dataset(dataset.clone(), Mode::Light);
        let h2 = Hasher::from_shared_dataset(dataset, Mode::Light);
        assert_eq!(h1.hash(b"x"), h2.hash(b"x"));
    }
}
