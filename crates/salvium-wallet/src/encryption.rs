//! Wallet file encryption.
//!
//! Encrypts wallet data using Argon2id key derivation + AES-256-GCM.
//! The encrypted format is self-contained with all parameters needed for
//! decryption (except the password).

use crate::error::WalletError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

/// Magic bytes identifying a Salvium wallet file.
const MAGIC: &[u8; 4] = b"SALW";

/// Current wallet file format version.
const VERSION: u8 = 1;

/// Header size: 4 (magic) + 1 (version) + 32 (salt) + 12 (nonce) = 49 bytes.
const HEADER_SIZE: usize = 49;

/// Argon2id parameters (OWASP recommended minimums).
const ARGON2_T_COST: u32 = 3;
const ARGON2_M_COST: u32 = 65536; // 64 MiB
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_DK_LEN: u32 = 32;

/// Encrypt wallet data with a password.
///
/// Returns the complete encrypted file contents (header + ciphertext).
#[allow(deprecated)] // aes-gcm 0.10 uses generic-array 0.x
pub fn encrypt_wallet_data(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>, WalletError> {
    let mut rng = rand::thread_rng();

    // Generate random salt and nonce.
    let mut salt = [0u8; 32];
    let mut nonce_bytes = [0u8; 12];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce_bytes);

    // Derive encryption key via Argon2id.
    let key_bytes = salvium_crypto::argon2id_hash(
        password,
        &salt,
        ARGON2_T_COST,
        ARGON2_M_COST,
        ARGON2_PARALLELISM,
        ARGON2_DK_LEN,
    );

    // Encrypt with AES-256-GCM.
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;

    // Build file: header + ciphertext.
    let mut output = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    output.extend_from_slice(MAGIC);
    output.push(VERSION);
    output.extend_from_slice(&salt);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Check if data is an encrypted wallet file (has SALW magic).
pub fn is_encrypted_wallet(data: &[u8]) -> bool {
    data.len() >= HEADER_SIZE && &data[0..4] == MAGIC
}

/// Re-encrypt wallet data with a new password.
///
/// Decrypts with the old password, then encrypts with the new one.
pub fn reencrypt_wallet_data(
    encrypted: &[u8],
    old_password: &[u8],
    new_password: &[u8],
) -> Result<Vec<u8>, WalletError> {
    let plaintext = decrypt_wallet_data(encrypted, old_password)?;
    encrypt_wallet_data(&plaintext, new_password)
}

/// Get the version byte from an encrypted wallet file.
pub fn wallet_file_version(data: &[u8]) -> Option<u8> {
    if data.len() >= 5 && &data[0..4] == MAGIC {
        Some(data[4])
    } else {
        None
    }
}

/// Decrypt wallet data with a password.
///
/// Takes the complete encrypted file contents, returns the decrypted plaintext.
#[allow(deprecated)] // aes-gcm 0.10 uses generic-array 0.x
pub fn decrypt_wallet_data(encrypted: &[u8], password: &[u8]) -> Result<Vec<u8>, WalletError> {
    if encrypted.len() < HEADER_SIZE {
        return Err(WalletError::InvalidFile("file too short".into()));
    }

    // Verify magic.
    if &encrypted[0..4] != MAGIC {
        return Err(WalletError::InvalidFile("invalid magic bytes".into()));
    }

    // Check version.
    let version = encrypted[4];
    if version != VERSION {
        return Err(WalletError::InvalidFile(format!(
            "unsupported version: {}",
            version
        )));
    }

    // Extract salt, nonce, and ciphertext.
    let salt = &encrypted[5..37];
    let nonce_bytes = &encrypted[37..49];
    let ciphertext = &encrypted[49..];

    if ciphertext.is_empty() {
        return Err(WalletError::InvalidFile("no ciphertext".into()));
    }

    // Derive encryption key via Argon2id.
    let key_bytes = salvium_crypto::argon2id_hash(
        password,
        salt,
        ARGON2_T_COST,
        ARGON2_M_COST,
        ARGON2_PARALLELISM,
        ARGON2_DK_LEN,
    );

    // Decrypt with AES-256-GCM.
    let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| WalletError::DecryptionFailed)?;

    Ok(plaintext)
}
