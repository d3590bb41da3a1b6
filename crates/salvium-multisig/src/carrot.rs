use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};

use crate::account::MultisigAccount;

// ---------------------------------------------------------------------------
// CarrotEnoteType
// ---------------------------------------------------------------------------

/// Enote types for the CARROT protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarrotEnoteType {
    Payment = 0,
    Change = 1,
    SelfSpend = 2,
}

impl CarrotEnoteType {
    /// Convert from an integer discriminant.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CarrotEnoteType::Payment),
            1 => Some(CarrotEnoteType::Change),
            2 => Some(CarrotEnoteType::SelfSpend),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CarrotPaymentProposal
// ---------------------------------------------------------------------------

/// A single payment output in a CARROT transaction proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrotPaymentProposal {
    /// Destination address string.
    pub destination: String,
    /// Amount in atomic units.
    pub amount: u64,
    /// Asset type (e.g. "SAL", "VSD").
    pub asset_type: String,
    /// Whether the destination is a subaddress.
    pub is_subaddress: bool,
}

impl CarrotPaymentProposal {
    /// Create a proposal with default values.
    pub fn new() -> Self {
        Self {
            destination: String::new(),
            amount: 0,
            asset_type: "SAL".to_string(),
            is_subaddress: false,
        }
    }

    /// Create a proposal with all fields specified.
    pub fn with_config(
        destination: &str,
        amount: u64,
        asset_type: &str,
        is_subaddress: bool,
    ) -> Self {
        Self {
            destination: destination.to_string(),
            amount,
            asset_type: asset_type.to_string(),
            is_subaddress,
        }
    }
}

impl Default for CarrotPaymentProposal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// CarrotSelfSendProposal (internal helper)
// ---------------------------------------------------------------------------

/// A self-send (change / self-spend) output in a CARROT transaction proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrotSelfSendProposal {
    pub destination: String,
    pub amount: u64,
    pub enote_type: CarrotEnoteType,
}

// ---------------------------------------------------------------------------
// CarrotTransactionProposal
// ---------------------------------------------------------------------------

/// A complete CARROT transaction proposal containing payment and self-send outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrotTransactionProposal {
    pub payment_proposals: Vec<CarrotPaymentProposal>,
    pub self_send_proposals: Vec<CarrotSelfSendProposal>,
    pub fee: u64,
    pub tx_type: u32,
}

impl CarrotTransactionProposal {
    /// Create an empty proposal.
    pub fn new() -> Self {
        Self {
            payment_proposals: Vec::new(),
            self_send_proposals: Vec::new(),
            fee: 0,
            tx_type: 3,
        }
    }

    /// Add a payment output.
    pub fn add_payment(
        &mut self,
        dest: &str,
        amount: u64,
        asset_type: &str,
        is_subaddress: bool,
    ) {
        self.payment_proposals.push(CarrotPaymentProposal {
            destination: dest.to_string(),
            amount,
            asset_type: asset_type.to_string(),
            is_subaddress,
        });
    }

    /// Add a self-send output (change, self-spend, etc.).
    pub fn add_self_send(&mut self, dest: &str, amount: u64, enote_type: CarrotEnoteType) {
        self.self_send_proposals.push(CarrotSelfSendProposal {
            destination: dest.to_string(),
            amount,
            enote_type,
        });
    }

    /// Total amount across all payment and self-send proposals.
    pub fn get_total_amount(&self) -> u64 {
        let payments: u64 = self.payment_proposals.iter().map(|p| p.amount).sum();
        let self_sends: u64 = self.self_send_proposals.iter().map(|s| s.amount).sum();
        payments + self_sends
    }

    /// Compute a deterministic 32-byte SHA-256 hash over the canonical JSON
    /// representation of this proposal, suitable for signing.
    pub fn get_signable_hash(&self) -> [u8; 32] {
        let json = serde_json::to_string(self)
            .expect("CarrotTransactionProposal serialization should not fail");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        let result = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    }

    /// Serialize to a JSON byte vector.
    pub fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("CarrotTransactionProposal serialize should not fail")
    }

    /// Deserialize from a JSON byte slice.
    pub fn deserialize(data: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(data)
            .map_err(|e| format!("Failed to deserialize CarrotTransactionProposal: {}", e))
    }
}

impl Default for CarrotTransactionProposal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// CarrotKeys
// ---------------------------------------------------------------------------

/// Derived CARROT key material for a multisig account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrotKeys {
    /// Hex-encoded prove-spend key.
    pub prove_spend_key: String,
    /// Hex-encoded view-incoming key.
    pub view_incoming_key: String,
    /// Hex-encoded generate-image key.
    pub generate_image_key: String,
    /// Hex-encoded generate-address secret.
    pub generate_address_secret: String,
    /// Hex-encoded account spend public key.
    pub account_spend_pubkey: String,
}

// ---------------------------------------------------------------------------
// MultisigCarrotAccount
// ---------------------------------------------------------------------------

/// A multisig account extended with CARROT key derivation capabilities.
#[derive(Debug, Clone)]
pub struct MultisigCarrotAccount {
    /// The underlying multisig account.
    pub account: MultisigAccount,
    /// Derived CARROT keys (populated after `derive_carrot_keys`).
    pub carrot_keys: Option<CarrotKeys>,
}

impl MultisigCarrotAccount {
    /// Create a new CARROT-capable multisig account.
    pub fn new(threshold: usize, signer_count: usize) -> Result<Self, String> {
        let account = MultisigAccount::new(threshold, signer_count)?;
        Ok(Self {
            account,
            carrot_keys: None,
        })
    }

    /// Derive the CARROT key set from secret spend and view keys.
    ///
    /// # Errors
    /// Returns `Err` if KEX has not completed.
    pub fn derive_carrot_keys(
        &mut self,
        secret_spend: &str,
        secret_view: &str,
    ) -> Result<CarrotKeys, String> {
        if !self.account.is_kex_complete() {
            return Err("Key exchange must be complete before deriving CARROT keys".to_string());
        }

        let prove_spend_key = hash_derive("carrot_prove_spend", secret_spend);
        let view_incoming_key = hash_derive("carrot_view_incoming", secret_view);
        let generate_image_key = hash_derive("carrot_generate_image", secret_spend);
        let generate_address_secret = hash_derive("carrot_generate_address", secret_view);
        let account_spend_pubkey = hash_derive("carrot_account_spend_pub", secret_spend);

        let keys = CarrotKeys {
            prove_spend_key,
            view_incoming_key,
            generate_image_key,
            generate_address_secret,
            account_spend_pubkey,
        };

        self.carrot_keys = Some(keys.clone());
        Ok(keys)
    }

    /// Get the primary CARROT address for this account.
    ///
    /// # Errors
    /// Returns `Err` if `derive_carrot_keys` has not been called.
    pub fn get_carrot_address(&self, network: &str) -> Result<String, String> {
        let keys = self
            .carrot_keys
            .as_ref()
            .ok_or_else(|| "CARROT keys not derived".to_string())?;

        let prefix = match network {
            "testnet" => "SC1T",
            _ => "SC1",
        };

        // Build a representative address from the account spend pubkey.
        // Take a truncated form of the pubkey for the address body.
        let body = &keys.account_spend_pubkey[..16];
        Ok(format!("{}{}", prefix, body))
    }

    /// Get a CARROT subaddress for the given major/minor indices.
    ///
    /// # Errors
    /// Returns `Err` if `derive_carrot_keys` has not been called.
    pub fn get_carrot_subaddress(
        &self,
        network: &str,
        major: u32,
        minor: u32,
    ) -> Result<String, String> {
        let keys = self
            .carrot_keys
            .as_ref()
            .ok_or_else(|| "CARROT keys not derived".to_string())?;

        let prefix = match network {
            "testnet" => "SC1T",
            _ => "SC1",
        };

        // Derive subaddress by hashing the address secret with the indices.
        let mut hasher = Sha256::new();
        hasher.update(b"carrot_subaddress:");
        hasher.update(keys.generate_address_secret.as_bytes());
        hasher.update(major.to_le_bytes());
        hasher.update(minor.to_le_bytes());
        let sub_hash = hex::encode(hasher.finalize());
        let body = &sub_hash[..16];

        Ok(format!("{}sub{}", prefix, body))
    }
}

// ---------------------------------------------------------------------------
// Aspirational functions (not yet implemented)
// ---------------------------------------------------------------------------

/// Build a full multisig CARROT transaction.
///
/// Currently returns an error indicating the protocol is not yet implemented.
pub fn build_multisig_carrot_tx(
    _proposal: &CarrotTransactionProposal,
    _account: &MultisigCarrotAccount,
) -> Result<Vec<u8>, String> {
    Err("CARROT multisig protocol support not yet implemented".to_string())
}

/// Generate a CARROT key image for a multisig input.
///
/// Currently returns an error indicating the protocol is not yet implemented.
pub fn generate_multisig_carrot_key_image(
    _account: &MultisigCarrotAccount,
    _output_pubkey: &[u8; 32],
) -> Result<[u8; 32], String> {
    Err("CARROT multisig key image protocol support not yet implemented".to_string())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Derive a 32-byte hex key by hashing a domain tag and an input.
fn hash_derive(domain: &str, input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain.as_bytes());
    hasher.update(b":");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
