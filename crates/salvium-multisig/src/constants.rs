use serde::{Deserialize, Serialize};

/// Maximum number of signers allowed in a multisig group.
pub const MULTISIG_MAX_SIGNERS: usize = 16;

/// Minimum threshold required for a valid multisig configuration.
pub const MULTISIG_MIN_THRESHOLD: usize = 2;

/// Number of nonce components per signer per signing attempt.
pub const MULTISIG_NONCE_COMPONENTS: usize = 2;

/// Types of messages exchanged during multisig protocol rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultisigMsgType {
    KexInit,
    KexRound,
    KexVerify,
    TxSet,
    PartialSig,
    FinalTx,
}

impl MultisigMsgType {
    /// Returns the string representation matching the JS constants.
    pub fn as_str(&self) -> &'static str {
        match self {
            MultisigMsgType::KexInit => "kex_init",
            MultisigMsgType::KexRound => "kex_round",
            MultisigMsgType::KexVerify => "kex_verify",
            MultisigMsgType::TxSet => "tx_set",
            MultisigMsgType::PartialSig => "partial_sig",
            MultisigMsgType::FinalTx => "final_tx",
        }
    }

    /// Parse from a string representation.
    pub fn from_str_repr(s: &str) -> Option<Self> {
        match s {
            "kex_init" => Some(MultisigMsgType::KexInit),
            "kex_round" => Some(MultisigMsgType::KexRound),
            "kex_verify" => Some(MultisigMsgType::KexVerify),
            "tx_set" => Some(MultisigMsgType::TxSet),
            "partial_sig" => Some(MultisigMsgType::PartialSig),
            "final_tx" => Some(MultisigMsgType::FinalTx),
            _ => None,
        }
    }
}
