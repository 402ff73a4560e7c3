// Storage module - PERSISTENCE
// Snapshot store for the ledger, operator identities and the replay set

mod store;

pub use store::{LedgerStore, StorageStats, StoreError};
