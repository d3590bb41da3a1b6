use serde::{Deserialize, Serialize};

/// A set of transactions prepared for multisig signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigTxSet {
    /// Serialized transactions (hex-encoded or JSON strings).
    pub transactions: Vec<String>,
    /// Key images associated with the transaction inputs.
    pub key_images: Vec<String>,
}

impl MultisigTxSet {
    /// Create a new empty transaction set.
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            key_images: Vec::new(),
        }
    }

    /// Add a transaction (as a hex/JSON string) to the set.
    pub fn add_transaction(&mut self, tx: String) {
        self.transactions.push(tx);
    }

    /// Add a key image (hex-encoded) to the set.
    pub fn add_key_image(&mut self, key_image: String) {
        self.key_images.push(key_image);
    }

    /// Serialize to a JSON byte vector.
    pub fn serialize(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("MultisigTxSet serialization should not fail")
    }

    /// Deserialize from a JSON byte slice.
    pub fn deserialize(data: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(data)
            .map_err(|e| format!("Failed to deserialize MultisigTxSet: {}", e))
    }

    /// Serialize to a JSON string.
    pub fn to_string(&self) -> String {
        serde_json::to_string(self).expect("MultisigTxSet to_string should not fail")
    }

    /// Deserialize from a JSON string.
    pub fn from_string(s: &str) -> Result<Self, String> {
        serde_json::from_str(s)
            .map_err(|e| format!("Failed to parse MultisigTxSet: {}", e))
    }
}

impl Default for MultisigTxSet {
    fn default() -> Self {
        Self::new()
    }
}
