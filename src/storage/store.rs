// LedgerStore - Persistent key-value storage using sled
//
// Provides typed access for storing:
// - The flight ledger snapshot
// - Named identity keypairs
// - Call ids already applied by the dispatcher

use crate::call::CallId;
use crate::identity::Keypair;
use crate::ledger::FlightLedger;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Key prefixes for organizing data
mod keys {
    pub const LEDGER: &[u8] = b"ledger:snapshot";
    pub const IDENTITY_PREFIX: &[u8] = b"identity:keypair:";
    pub const PROCESSED_CALL_PREFIX: &[u8] = b"dispatch:processed:";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent store for ledger snapshots
///
/// Uses sled for crash-safe, embedded storage.
/// All writes are atomic and durable after flush.
pub struct LedgerStore {
    db: sled::Db,
}

impl LedgerStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.is_empty())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    // ========================================================================
    // LEDGER SNAPSHOT
    // ========================================================================

    /// Save the ledger snapshot
    pub fn save_ledger(&self, ledger: &FlightLedger) -> Result<(), StoreError> {
        let bytes = ledger
            .to_bytes()
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.db.insert(keys::LEDGER, bytes)?;
        Ok(())
    }

    /// Load the ledger snapshot, if one was saved
    pub fn load_ledger(&self) -> Result<Option<FlightLedger>, StoreError> {
        match self.db.get(keys::LEDGER)? {
            Some(bytes) => {
                let ledger = FlightLedger::from_bytes(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(ledger))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // IDENTITY PERSISTENCE
    // ========================================================================

    /// Save a keypair under a label
    pub fn save_keypair(&self, label: &str, keypair: &Keypair) -> Result<(), StoreError> {
        let key = [keys::IDENTITY_PREFIX, label.as_bytes()].concat();
        self.db.insert(key, keypair.to_bytes())?;
        Ok(())
    }

    /// Load a keypair by label
    pub fn load_keypair(&self, label: &str) -> Result<Option<Keypair>, StoreError> {
        let key = [keys::IDENTITY_PREFIX, label.as_bytes()].concat();
        match self.db.get(key)? {
            Some(bytes) => {
                let keypair = Keypair::from_bytes(&bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(keypair))
            }
            None => Ok(None),
        }
    }

    /// All identity labels, sorted
    pub fn list_identities(&self) -> Result<Vec<String>, StoreError> {
        let mut labels = Vec::new();
        for result in self.db.scan_prefix(keys::IDENTITY_PREFIX) {
            let (key, _) = result?;
            let label = String::from_utf8_lossy(&key[keys::IDENTITY_PREFIX.len()..]).into_owned();
            labels.push(label);
        }
        Ok(labels)
    }

    // ========================================================================
    // REPLAY SET
    // ========================================================================

    /// Persist the ledger snapshot together with the replay set
    ///
    /// Both go into one sled batch, so an applied call is never stored
    /// without its replay entry. Persisted entries missing from `processed`
    /// (pruned by the dispatcher) are removed in the same batch.
    pub fn save_dispatch(
        &self,
        ledger: &FlightLedger,
        processed: &[(CallId, u64)],
    ) -> Result<(), StoreError> {
        let bytes = ledger
            .to_bytes()
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;

        let mut batch = sled::Batch::default();
        batch.insert(keys::LEDGER, bytes);

        let keep: HashSet<Vec<u8>> = processed.iter().map(|(id, _)| processed_key(id)).collect();
        for result in self.db.scan_prefix(keys::PROCESSED_CALL_PREFIX) {
            let (key, _) = result?;
            if !keep.contains(key.as_ref()) {
                batch.remove(key);
            }
        }
        for (id, timestamp) in processed {
            batch.insert(processed_key(id), timestamp.to_be_bytes().to_vec());
        }

        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Replay set as `(call id, call timestamp)`
    pub fn load_processed_calls(&self) -> Result<Vec<(CallId, u64)>, StoreError> {
        let mut calls = Vec::new();
        for result in self.db.scan_prefix(keys::PROCESSED_CALL_PREFIX) {
            let (key, value) = result?;
            let raw: [u8; 32] = key[keys::PROCESSED_CALL_PREFIX.len()..]
                .try_into()
                .map_err(|_| StoreError::DeserializationFailed("Invalid call id length".to_string()))?;
            let timestamp: [u8; 8] = value
                .as_ref()
                .try_into()
                .map_err(|_| StoreError::DeserializationFailed("Invalid call timestamp".to_string()))?;
            calls.push((CallId::from_bytes(raw), u64::from_be_bytes(timestamp)));
        }
        Ok(calls)
    }
}

fn processed_key(id: &CallId) -> Vec<u8> {
    [keys::PROCESSED_CALL_PREFIX, id.as_bytes().as_slice()].concat()
}
