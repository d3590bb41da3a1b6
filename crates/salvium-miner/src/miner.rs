//! Multi-threaded RandomX mining engine.
//!
//! Full mode: the Argon2d cache is expanded into the full dataset once and
//! shared read-only across worker threads. Light mode: each worker keeps
//! only the 256 MiB cache and computes dataset items on demand. Both modes
//! are backed by `salvium-randomx`, a pure-Rust RandomX implementation —
//! no vendored C library, no FFI.

use salvium_randomx::{FullDataset, Hasher, Mode};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

/// A found block ready for submission
pub struct FoundBlock {
    pub nonce: u32,
    pub hash: Vec<u8>,
    pub blob_hex: String,
    pub job_id: u64,
}

/// Job data sent to worker threads
#[derive(Clone)]
pub struct MiningJob {
    pub job_id: u64,
    pub hashing_blob: Vec<u8>,
    pub template_blob: Vec<u8>,
    pub difficulty: u128,
    pub height: u64,
}

/// Mining engine managing worker threads
pub struct MiningEngine {
    pub hash_count: Arc<AtomicU64>,
    pub running: Arc<AtomicBool>,
    result_rx: mpsc::Receiver<FoundBlock>,
    job_senders: Vec<mpsc::Sender<MiningJob>>,
    _handles: Vec<thread::JoinHandle<()>>,
}

impl MiningEngine {
    /// Initialize the mining engine with full mode: one shared dataset
    /// expanded once from `seed_hash`, then handed read-only to every
    /// worker thread's `Hasher`.
    pub fn new_full(num_threads: usize, seed_hash: &[u8], _use_large_pages: bool) -> Result<Self, String> {
        log::info!("Initializing RandomX cache (256 MiB)...");
        let cache = salvium_randomx::argon2d::init_cache(seed_hash);

        log::info!("Expanding RandomX dataset (~2080 MiB)...");
        let start = std::time::Instant::now();
        let cancel = AtomicBool::new(false);
        let dataset = FullDataset::build(
            &cache,
            |done, total| {
                if done % 4_194_304 == 0 {
                    log::info!("dataset expansion: {done}/{total} items");
                }
            },
            &cancel,
        );
        log::info!("Dataset ready in {:.1}s", start.elapsed().as_secs_f64());

        let dataset: Arc<dyn salvium_randomx::vm::DatasetSource + Send + Sync> = Arc::new(dataset);
        Self::spawn_workers(num_threads, dataset, Mode::Full)
    }

    /// Initialize light mode: each worker thread owns its own `Hasher`
    /// with an independently-initialised 256 MiB cache and no shared
    /// dataset.
    pub fn new_light(num_threads: usize, seed_hash: &[u8], _use_large_pages: bool) -> Result<Self, String> {
        let hash_count = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));
        let (result_tx, result_rx) = mpsc::channel();
        let mut job_senders = Vec::new();
        let mut handles = Vec::new();

        let seed = seed_hash.to_vec();

        for worker_id in 0..num_threads {
            let (job_tx, job_rx) = mpsc::channel::<MiningJob>();
            job_senders.push(job_tx);

            let hash_count = Arc::clone(&hash_count);
            let running = Arc::clone(&running);
            let result_tx = result_tx.clone();
            let seed = seed.clone();
            let nonce_start = (worker_id as u64 * (u32::MAX as u64 / num_threads as u64)) as u32;

            let handle = thread::spawn(move || {
                let hasher = Hasher::new_light(&seed);
                log::info!("worker {worker_id} ready (light mode)");

                while running.load(Ordering::Relaxed) {
                    let job = match job_rx.recv_timeout(std::time::Duration::from_millis(100)) {
                        Ok(j) => j,
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(_) => break,
                    };

                    let nonce_offset = find_nonce_offset(&job.hashing_blob);
                    let mut current_job = job;
                    loop {
                        match mine_job(
                            &hasher, &current_job, &running, &hash_count, &result_tx, nonce_start, nonce_offset, &job_rx,
                        ) {
                            Some(new_job) => current_job = new_job,
                            None => break,
                        }
                    }
                }
            });

            handles.push(handle);
        }

        Ok(Self {
            hash_count,
            running,
            result_rx,
            job_senders,
            _handles: handles,
        })
    }

    fn spawn_workers(
        num_threads: usize,
        dataset: Arc<dyn salvium_randomx::vm::DatasetSource + Send + Sync>,
        mode: Mode,
    ) -> Result<Self, String> {
        let hash_count = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));
        let (result_tx, result_rx) = mpsc::channel();
        let mut job_senders = Vec::new();
        let mut handles = Vec::new();

        for worker_id in 0..num_threads {
            let (job_tx, job_rx) = mpsc::channel::<MiningJob>();
            job_senders.push(job_tx);

            let hash_count = Arc::clone(&hash_count);
            let running = Arc::clone(&running);
            let result_tx = result_tx.clone();
            let dataset = Arc::clone(&dataset);
            let nonce_start = (worker_id as u64 * (u32::MAX as u64 / num_threads as u64)) as u32;

            let handle = thread::spawn(move || {
                let hasher = Hasher::from_shared_dataset(dataset, mode);
                log::info!("worker {worker_id} ready");

                while running.load(Ordering::Relaxed) {
                    let job = match job_rx.recv_timeout(std::time::Duration::from_millis(100)) {
                        Ok(j) => j,
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(_) => break,
                    };

                    let nonce_offset = find_nonce_offset(&job.hashing_blob);
                    let mut current_job = job;
                    loop {
                        match mine_job(
                            &hasher, &current_job, &running, &hash_count, &result_tx, nonce_start, nonce_offset, &job_rx,
                        ) {
                            Some(new_job) => current_job = new_job,
                            None => break,
                        }
                    }
                }
            });

            handles.push(handle);
        }

        Ok(Self {
            hash_count,
            running,
            result_rx,
            job_senders,
            _handles: handles,
        })
    }

    pub fn send_job(&self, job: MiningJob) {
        for tx in &self.job_senders {
            let _ = tx.send(job.clone());
        }
    }

    pub fn try_recv_block(&self) -> Option<FoundBlock> {
        self.result_rx.try_recv().ok()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Mine a single job on a worker's `Hasher`, checking for a replacement
/// job on every iteration so workers can switch to updated templates
/// without waiting for the nonce space to exhaust.
fn mine_job(
    hasher: &Hasher,
    job: &MiningJob,
    running: &AtomicBool,
    hash_count: &AtomicU64,
    result_tx: &mpsc::Sender<FoundBlock>,
    nonce_start: u32,
    nonce_offset: usize,
    job_rx: &mpsc::Receiver<MiningJob>,
) -> Option<MiningJob> {
    let mut nonce = nonce_start;
    let mut blob = job.hashing_blob.clone();

    loop {
        if !running.load(Ordering::Relaxed) {
            return None;
        }

        if let Ok(new_job) = job_rx.try_recv() {
            return Some(new_job);
        }

        set_nonce(&mut blob, nonce_offset, nonce);
        let hash = hasher.hash(&blob);
        hash_count.fetch_add(1, Ordering::Relaxed);

        if check_hash(&hash, job.difficulty) {
            submit_block(job, nonce, &hash, result_tx);
        }

        nonce = nonce.wrapping_add(1);
        if nonce == nonce_start {
            return None;
        }
    }
}

fn submit_block(job: &MiningJob, nonce: u32, hash: &[u8; 32], result_tx: &mpsc::Sender<FoundBlock>) {
    let mut template = job.template_blob.clone();
    let tmpl_offset = find_nonce_offset(&template);
    set_nonce(&mut template, tmpl_offset, nonce);
    let _ = result_tx.send(FoundBlock {
        nonce,
        hash: hash.to_vec(),
        blob_hex: hex::encode(&template),
        job_id: job.job_id,
    });
}

pub(crate) fn set_nonce(blob: &mut [u8], offset: usize, nonce: u32) {
    blob[offset] = (nonce & 0xff) as u8;
    blob[offset + 1] = ((nonce >> 8) & 0xff) as u8;
    blob[offset + 2] = ((nonce >> 16) & 0xff) as u8;
    blob[offset + 3] = ((nonce >> 24) & 0xff) as u8;
}

/// Find nonce offset in block hashing blob.
/// Layout: major_version(varint) + minor_version(varint) + timestamp(varint) + prev_id(32 bytes) + nonce(4 bytes)
pub fn find_nonce_offset(blob: &[u8]) -> usize {
    let mut offset = 0;
    for _ in 0..3 {
        while blob[offset] & 0x80 != 0 {
            offset += 1;
        }
        offset += 1;
    }
    offset += 32;
    offset
}

/// Check if hash meets difficulty target.
/// CryptoNote convention: interpret hash as little-endian 256-bit integer,
/// block is valid if hash * difficulty < 2^256.
pub(crate) fn check_hash(hash: &[u8], difficulty: u128) -> bool {
    if difficulty == 0 {
        return false;
    }
    let mut lo = 0u128;
    let mut hi = 0u128;
    for i in 0..16 {
        lo |= (hash[i] as u128) << (i * 8);
    }
    for i in 0..16 {
        hi |= (hash[16 + i] as u128) << (i * 8);
    }

    let (_, lo_overflow) = lo.overflowing_mul(difficulty);
    let hi_prod = match hi.checked_mul(difficulty) {
        Some(h) => h,
        None => return false,
    };
    let carry = if lo_overflow { difficulty } else { 0 };
    hi_prod.checked_add(carry).is_some()
}

/// Parse difficulty from wide_difficulty hex string or u64
pub fn parse_difficulty(difficulty: u64, wide_difficulty: Option<&str>) -> u128 {
    if let Some(wide) = wide_difficulty {
        let hex_str = wide.strip_prefix("0x").unwrap_or(wide);
        u128::from_str_radix(hex_str, 16).unwrap_or(difficulty as u128)
    } else {
        difficulty as u128
    }
}
