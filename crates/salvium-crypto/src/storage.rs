//! Wallet storage interface.
//!
//! File persistence of the scanned-output cache is a storage back-end
//! concern, and is deliberately not implemented here to production depth —
//! this module describes the shape consumers need (output/transaction/stake
//! rows, balance and history queries, a sync-height cursor) through a small
//! in-memory reference implementation. A real deployment backs [`WalletDb`]
//! with SQLCipher or an equivalent encrypted store; swapping that in means
//! replacing this file's body, not the call sites in `salvium-wallet`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Error surfaced by [`WalletDb`] operations. Callers map this to their own
/// error taxonomy (e.g. `WalletError::Storage`) via `.to_string()`.
#[derive(Debug)]
pub struct StorageError(pub String);

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage error: {}", self.0)
    }
}

impl std::error::Error for StorageError {}

// ─── Data Models ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRow {
    pub key_image: Option<String>,
    pub public_key: Option<String>,
    pub tx_hash: String,
    #[serde(default)]
    pub output_index: i64,
    pub global_index: Option<i64>,
    pub asset_type_index: Option<i64>,
    pub block_height: Option<i64>,
    pub block_timestamp: Option<i64>,
    #[serde(default = "default_zero_str")]
    pub amount: String,
    #[serde(default = "default_sal")]
    pub asset_type: String,
    pub commitment: Option<String>,
    pub mask: Option<String>,
    #[serde(default)]
    pub subaddress_index: SubaddressIndex,
    #[serde(default)]
    pub is_carrot: bool,
    pub carrot_ephemeral_pubkey: Option<String>,
    pub carrot_shared_secret: Option<String>,
    pub carrot_enote_type: Option<i64>,
    #[serde(default)]
    pub is_spent: bool,
    pub spent_height: Option<i64>,
    pub spent_tx_hash: Option<String>,
    #[serde(default = "default_zero_str")]
    pub unlock_time: String,
    #[serde(default = "default_tx_type")]
    pub tx_type: i64,
    pub tx_pub_key: Option<String>,
    #[serde(default)]
    pub is_frozen: bool,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubaddressIndex {
    #[serde(default)]
    pub major: i64,
    #[serde(default)]
    pub minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub tx_hash: String,
    pub tx_pub_key: Option<String>,
    pub block_height: Option<i64>,
    pub block_timestamp: Option<i64>,
    #[serde(default)]
    pub confirmations: i64,
    #[serde(default)]
    pub in_pool: bool,
    #[serde(default)]
    pub is_failed: bool,
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default)]
    pub is_incoming: bool,
    #[serde(default)]
    pub is_outgoing: bool,
    #[serde(default = "default_zero_str")]
    pub incoming_amount: String,
    #[serde(default = "default_zero_str")]
    pub outgoing_amount: String,
    #[serde(default = "default_zero_str")]
    pub fee: String,
    #[serde(default = "default_zero_str")]
    pub change_amount: String,
    pub transfers: Option<serde_json::Value>,
    pub payment_id: Option<String>,
    #[serde(default = "default_zero_str")]
    pub unlock_time: String,
    #[serde(default = "default_tx_type")]
    pub tx_type: i64,
    #[serde(default = "default_sal")]
    pub asset_type: String,
    #[serde(default)]
    pub is_miner_tx: bool,
    #[serde(default)]
    pub is_protocol_tx: bool,
    #[serde(default)]
    pub note: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputQuery {
    pub is_spent: Option<bool>,
    pub is_frozen: Option<bool>,
    pub asset_type: Option<String>,
    pub tx_type: Option<i64>,
    pub account_index: Option<i64>,
    pub subaddress_index: Option<i64>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxQuery {
    pub is_incoming: Option<bool>,
    pub is_outgoing: Option<bool>,
    pub is_confirmed: Option<bool>,
    pub in_pool: Option<bool>,
    pub tx_type: Option<i64>,
    pub min_height: Option<i64>,
    pub max_height: Option<i64>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResult {
    pub balance: String,
    pub unlocked_balance: String,
    pub locked_balance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRow {
    pub stake_tx_hash: String,
    pub stake_height: Option<i64>,
    pub stake_timestamp: Option<i64>,
    #[serde(default = "default_zero_str")]
    pub amount_staked: String,
    #[serde(default = "default_zero_str")]
    pub fee: String,
    #[serde(default = "default_sal")]
    pub asset_type: String,
    pub change_output_key: Option<String>,
    #[serde(default = "default_locked")]
    pub status: String,
    pub return_tx_hash: Option<String>,
    pub return_height: Option<i64>,
    pub return_timestamp: Option<i64>,
    #[serde(default = "default_zero_str")]
    pub return_amount: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

fn default_zero_str() -> String {
    "0".to_string()
}
fn default_sal() -> String {
    "SAL".to_string()
}
fn default_tx_type() -> i64 {
    3
}
fn default_locked() -> String {
    "locked".to_string()
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Determine whether an output's `unlock_time` has passed, per the same
/// block-height-or-timestamp convention the consensus rules use: values
/// below 500,000,000 are block heights, at or above are unix timestamps.
fn is_unlocked(current_height: i64, block_height: Option<i64>, unlock_time_str: &str, now_secs: i64) -> bool {
    let unlock_time: i64 = unlock_time_str.parse().unwrap_or(0);
    if unlock_time == 0 {
        return true;
    }
    if unlock_time < 500_000_000 {
        block_height.map(|h| h + unlock_time <= current_height).unwrap_or(false)
    } else {
        unlock_time <= now_secs
    }
}

// ─── WalletDb ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct State {
    outputs: HashMap<String, OutputRow>,
    unkeyed_outputs: Vec<OutputRow>,
    txs: HashMap<String, TransactionRow>,
    stakes: HashMap<String, StakeRow>,
    block_hashes: HashMap<i64, String>,
    sync_height: i64,
}

/// In-memory reference implementation of the wallet's output/transaction
/// cache. Holds the same shape a persistent backend would (see module docs)
/// without surviving process restarts; a real client wires a durable store
/// behind this same API.
pub struct WalletDb {
    state: Mutex<State>,
}

impl WalletDb {
    /// `path`/`key` are accepted to match the persistent-backend interface
    /// consumers call through; this reference implementation ignores them.
    pub fn open(_path: &str, _key: &[u8]) -> Result<Self, StorageError> {
        Ok(WalletDb { state: Mutex::new(State::default()) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn put_output(&self, row: &OutputRow) -> Result<(), StorageError> {
        let mut row = row.clone();
        row.updated_at = Some(now_millis());
        if row.created_at.is_none() {
            row.created_at = Some(now_millis());
        }
        let mut state = self.lock();
        match &row.key_image {
            Some(ki) => {
                state.outputs.insert(ki.clone(), row);
            }
            None => state.unkeyed_outputs.push(row),
        }
        Ok(())
    }

    pub fn get_output(&self, key_image: &str) -> Result<Option<OutputRow>, StorageError> {
        Ok(self.lock().outputs.get(key_image).cloned())
    }

    pub fn get_outputs(&self, query: &OutputQuery) -> Result<Vec<OutputRow>, StorageError> {
        let state = self.lock();
        let rows = state.outputs.values().chain(state.unkeyed_outputs.iter());
        Ok(rows
            .filter(|r| query.is_spent.map(|v| r.is_spent == v).unwrap_or(true))
            .filter(|r| query.is_frozen.map(|v| r.is_frozen == v).unwrap_or(true))
            .filter(|r| query.asset_type.as_deref().map(|v| r.asset_type == v).unwrap_or(true))
            .filter(|r| query.tx_type.map(|v| r.tx_type == v).unwrap_or(true))
            .filter(|r| query.account_index.map(|v| r.subaddress_index.major == v).unwrap_or(true))
            .filter(|r| query.subaddress_index.map(|v| r.subaddress_index.minor == v).unwrap_or(true))
            .cloned()
            .collect())
    }

    pub fn mark_spent(&self, key_image: &str, spending_tx: &str, spent_height: i64) -> Result<(), StorageError> {
        let mut state = self.lock();
        if let Some(row) = state.outputs.get_mut(key_image) {
            row.is_spent = true;
            row.spent_tx_hash = Some(spending_tx.to_string());
            row.spent_height = Some(spent_height);
            row.updated_at = Some(now_millis());
        }
        Ok(())
    }

    pub fn mark_unspent(&self, key_image: &str) -> Result<(), StorageError> {
        let mut state = self.lock();
        if let Some(row) = state.outputs.get_mut(key_image) {
            row.is_spent = false;
            row.spent_tx_hash = None;
            row.spent_height = None;
            row.updated_at = Some(now_millis());
        }
        Ok(())
    }

    pub fn put_tx(&self, row: &TransactionRow) -> Result<(), StorageError> {
        let mut row = row.clone();
        row.updated_at = Some(now_millis());
        if row.created_at.is_none() {
            row.created_at = Some(now_millis());
        }
        self.lock().txs.insert(row.tx_hash.clone(), row);
        Ok(())
    }

    pub fn get_tx(&self, tx_hash: &str) -> Result<Option<TransactionRow>, StorageError> {
        Ok(self.lock().txs.get(tx_hash).cloned())
    }

    pub fn get_txs(&self, query: &TxQuery) -> Result<Vec<TransactionRow>, StorageError> {
        let state = self.lock();
        Ok(state
            .txs
            .values()
            .filter(|r| query.is_incoming.map(|v| r.is_incoming == v).unwrap_or(true))
            .filter(|r| query.is_outgoing.map(|v| r.is_outgoing == v).unwrap_or(true))
            .filter(|r| query.is_confirmed.map(|v| r.is_confirmed == v).unwrap_or(true))
            .filter(|r| query.in_pool.map(|v| r.in_pool == v).unwrap_or(true))
            .filter(|r| query.tx_type.map(|v| r.tx_type == v).unwrap_or(true))
            .filter(|r| query.min_height.map(|v| r.block_height.unwrap_or(0) >= v).unwrap_or(true))
            .filter(|r| query.max_height.map(|v| r.block_height.unwrap_or(i64::MAX) <= v).unwrap_or(true))
            .filter(|r| query.tx_hash.as_deref().map(|v| r.tx_hash == v).unwrap_or(true))
            .cloned()
            .collect())
    }

    pub fn get_sync_height(&self) -> Result<i64, StorageError> {
        Ok(self.lock().sync_height)
    }

    pub fn set_sync_height(&self, height: i64) -> Result<(), StorageError> {
        self.lock().sync_height = height;
        Ok(())
    }

    pub fn put_block_hash(&self, height: i64, hash: &str) -> Result<(), StorageError> {
        self.lock().block_hashes.insert(height, hash.to_string());
        Ok(())
    }

    pub fn get_block_hash(&self, height: i64) -> Result<Option<String>, StorageError> {
        Ok(self.lock().block_hashes.get(&height).cloned())
    }

    /// Discard all cached state above `height`: reorg recovery rolls the
    /// scanned-output cache back to a known-good point.
    pub fn rollback(&self, height: i64) -> Result<(), StorageError> {
        let mut state = self.lock();
        state.outputs.retain(|_, r| r.block_height.map(|h| h <= height).unwrap_or(true));
        state.unkeyed_outputs.retain(|r| r.block_height.map(|h| h <= height).unwrap_or(true));
        state.txs.retain(|_, r| r.block_height.map(|h| h <= height).unwrap_or(true));
        state.stakes.retain(|_, r| r.stake_height.map(|h| h <= height).unwrap_or(true));
        state.block_hashes.retain(|&h, _| h <= height);
        if state.sync_height > height {
            state.sync_height = height;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        *self.lock() = State::default();
        Ok(())
    }

    pub fn get_asset_types(&self) -> Result<Vec<String>, StorageError> {
        let state = self.lock();
        let mut types: Vec<String> = state.outputs.values().map(|r| r.asset_type.clone()).collect();
        types.sort();
        types.dedup();
        Ok(types)
    }

    pub fn get_balance(&self, current_height: i64, asset_type: &str, account_index: i32) -> Result<BalanceResult, StorageError> {
        let now_secs = now_millis() / 1000;
        let state = self.lock();
        let (mut total, mut unlocked) = (0i128, 0i128);
        for row in state.outputs.values() {
            if row.is_spent || row.asset_type != asset_type || row.subaddress_index.major != account_index as i64 {
                continue;
            }
            let amount: i128 = row.amount.parse().unwrap_or(0);
            total += amount;
            if is_unlocked(current_height, row.block_height, &row.unlock_time, now_secs) {
                unlocked += amount;
            }
        }
        Ok(BalanceResult {
            balance: total.to_string(),
            unlocked_balance: unlocked.to_string(),
            locked_balance: (total - unlocked).to_string(),
        })
    }

    pub fn get_all_balances(&self, current_height: i64, account_index: i32) -> Result<HashMap<String, BalanceResult>, StorageError> {
        let types = self.get_asset_types()?;
        let mut out = HashMap::new();
        for asset_type in types {
            out.insert(asset_type.clone(), self.get_balance(current_height, &asset_type, account_index)?);
        }
        Ok(out)
    }

    pub fn put_stake(&self, row: &StakeRow) -> Result<(), StorageError> {
        let mut row = row.clone();
        row.updated_at = Some(now_millis());
        if row.created_at.is_none() {
            row.created_at = Some(now_millis());
        }
        self.lock().stakes.insert(row.stake_tx_hash.clone(), row);
        Ok(())
    }

    pub fn get_stake(&self, stake_tx_hash: &str) -> Result<Option<StakeRow>, StorageError> {
        Ok(self.lock().stakes.get(stake_tx_hash).cloned())
    }

    pub fn get_stakes(&self, status: Option<&str>, asset_type: Option<&str>) -> Result<Vec<StakeRow>, StorageError> {
        let state = self.lock();
        Ok(state
            .stakes
            .values()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .filter(|r| asset_type.map(|a| r.asset_type == a).unwrap_or(true))
            .cloned()
            .collect())
    }

    pub fn get_stake_by_output_key(&self, change_output_key: &str) -> Result<Option<StakeRow>, StorageError> {
        Ok(self
            .lock()
            .stakes
            .values()
            .find(|r| r.change_output_key.as_deref() == Some(change_output_key))
            .cloned())
    }

    pub fn mark_stake_returned(
        &self,
        stake_tx_hash: &str,
        return_tx_hash: &str,
        return_height: i64,
        return_timestamp: i64,
        return_amount: &str,
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        if let Some(row) = state.stakes.get_mut(stake_tx_hash) {
            row.status = "returned".to_string();
            row.return_tx_hash = Some(return_tx_hash.to_string());
            row.return_height = Some(return_height);
            row.return_timestamp = Some(return_timestamp);
            row.return_amount = return_amount.to_string();
            row.updated_at = Some(now_millis());
        }
        Ok(())
    }

    pub fn delete_stakes_above(&self, height: i64) -> Result<(), StorageError> {
        self.lock().stakes.retain(|_, r| r.stake_height.map(|h| h <= height).unwrap_or(true));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_output(key_image: &str, amount: &str) -> OutputRow {
        OutputRow {
            key_image: Some(key_image.to_string()),
            public_key: None,
            tx_hash: "tx1".to_string(),
            output_index: 0,
            global_index: None,
            asset_type_index: None,
            block_height: Some(100),
            block_timestamp: None,
            amount: amount.to_string(),
            asset_type: "SAL".to_string(),
            commitment: None,
            mask: None,
            subaddress_index: SubaddressIndex::default(),
            is_carrot: false,
            carrot_ephemeral_pubkey: None,
            carrot_shared_secret: None,
            carrot_enote_type: None,
            is_spent: false,
            spent_height: None,
            spent_tx_hash: None,
            unlock_time: "0".to_string(),
            tx_type: 3,
            tx_pub_key: None,
            is_frozen: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_put_and_get_output() {
        let db = WalletDb::open(":memory:", &[]).unwrap();
        db.put_output(&make_output("ki1", "1000")).unwrap();
        let got = db.get_output("ki1").unwrap().unwrap();
        assert_eq!(got.amount, "1000");
    }

    #[test]
    fn test_mark_spent_and_unspent() {
        let db = WalletDb::open(":memory:", &[]).unwrap();
        db.put_output(&make_output("ki2", "500")).unwrap();
        db.mark_spent("ki2", "tx2", 200).unwrap();
        assert!(db.get_output("ki2").unwrap().unwrap().is_spent);
        db.mark_unspent("ki2").unwrap();
        assert!(!db.get_output("ki2").unwrap().unwrap().is_spent);
    }

    #[test]
    fn test_balance_excludes_spent() {
        let db = WalletDb::open(":memory:", &[]).unwrap();
        db.put_output(&make_output("ki3", "300")).unwrap();
        db.put_output(&make_output("ki4", "200")).unwrap();
        db.mark_spent("ki4", "tx3", 150).unwrap();
        let balance = db.get_balance(1_000, "SAL", 0).unwrap();
        assert_eq!(balance.balance, "300");
    }

    #[test]
    fn test_rollback_drops_outputs_above_height() {
        let db = WalletDb::open(":memory:", &[]).unwrap();
        db.put_output(&make_output("ki5", "1")).unwrap();
        db.set_sync_height(100).unwrap();
        db.rollback(50).unwrap();
        assert!(db.get_output("ki5").unwrap().is_none());
        assert_eq!(db.get_sync_height().unwrap(), 50);
    }

    #[test]
    fn test_stake_lifecycle() {
        let db = WalletDb::open(":memory:", &[]).unwrap();
        db.put_stake(&StakeRow {
            stake_tx_hash: "stake1".to_string(),
            stake_height: Some(10),
            stake_timestamp: None,
            amount_staked: "50000".to_string(),
            fee: "0".to_string(),
            asset_type: "SAL".to_string(),
            change_output_key: Some("outkey1".to_string()),
            status: "locked".to_string(),
            return_tx_hash: None,
            return_height: None,
            return_timestamp: None,
            return_amount: "0".to_string(),
            created_at: None,
            updated_at: None,
        })
        .unwrap();
        assert_eq!(db.get_stakes(Some("locked"), None).unwrap().len(), 1);
        db.mark_stake_returned("stake1", "rtx1", 20, 1700000000, "50000").unwrap();
        assert_eq!(db.get_stakes(Some("returned"), None).unwrap().len(), 1);
        assert_eq!(db.get_stake_by_output_key("outkey1").unwrap().unwrap().stake_tx_hash, "stake1");
    }
}
