// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CHECKPOINT SYNC (CPS) - PERSISTENCE
//
// Two reserved records:
//   sync_checkpoint    32-byte accepted checkpoint hash
//   checkpoint_pubkey  master public key the stored checkpoint was accepted under
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::CheckpointError;
use cps_crypto::Hash256;
use log::{info, warn};
use std::path::Path;

const KEY_SYNC_CHECKPOINT: &[u8] = b"sync_checkpoint";
const KEY_CHECKPOINT_PUBKEY: &[u8] = b"checkpoint_pubkey";

/// Durable storage for the accepted checkpoint.
pub trait CheckpointStore: Send + Sync {
    fn read_sync_checkpoint(&self) -> Result<Option<Hash256>, CheckpointError>;
    fn write_sync_checkpoint(&self, hash: &Hash256) -> Result<(), CheckpointError>;
    fn read_checkpoint_pubkey(&self) -> Result<Option<Vec<u8>>, CheckpointError>;
    fn write_checkpoint_pubkey(&self, key: &[u8]) -> Result<(), CheckpointError>;
}

/// sled-backed checkpoint store.
pub struct SledCheckpointStore {
    db: sled::Db,
}

impl SledCheckpointStore {
    /// Open (or create) the store, retrying while another process releases
    /// the sled lock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let path_ref = path.as_ref();
        let max_retries = 5u32;
        let mut last_err = String::new();

        for attempt in 0..max_retries {
            match Self::try_open(path_ref) {
                Ok(store) => {
                    if attempt > 0 {
                        info!(
                            "Checkpoint store opened after {} retries: {}",
                            attempt,
                            path_ref.display()
                        );
                    }
                    return Ok(store);
                }
                Err(e) if Self::is_lock_error(&e) && attempt < max_retries - 1 => {
                    let delay_ms = 200 * 2u64.pow(attempt);
                    warn!(
                        "Checkpoint store locked (attempt {}/{}), retrying in {}ms: {}",
                        attempt + 1,
                        max_retries,
                        delay_ms,
                        path_ref.display()
                    );
                    std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                    last_err = e.to_string();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CheckpointError::Persistence(format!(
            "Failed to open checkpoint store after {} retries: {}",
            max_retries, last_err
        )))
    }

    /// In-memory store that disappears on drop.
    pub fn temporary() -> Result<Self, CheckpointError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn try_open(path: &Path) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn is_lock_error(e: &sled::Error) -> bool {
        let msg = e.to_string().to_lowercase();
        msg.contains("lock") || msg.contains("resource temporarily unavailable")
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), CheckpointError> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }
}

impl CheckpointStore for SledCheckpointStore {
    fn read_sync_checkpoint(&self) -> Result<Option<Hash256>, CheckpointError> {
        match self.db.get(KEY_SYNC_CHECKPOINT)? {
            Some(bytes) => Hash256::from_slice(&bytes).map(Some).map_err(|e| {
                CheckpointError::Persistence(format!("corrupt sync_checkpoint record: {}", e))
            }),
            None => Ok(None),
        }
    }

    fn write_sync_checkpoint(&self, hash: &Hash256) -> Result<(), CheckpointError> {
        self.put(KEY_SYNC_CHECKPOINT, hash.as_bytes())
    }

    fn read_checkpoint_pubkey(&self) -> Result<Option<Vec<u8>>, CheckpointError> {
        Ok(self.db.get(KEY_CHECKPOINT_PUBKEY)?.map(|v| v.to_vec()))
    }

    fn write_checkpoint_pubkey(&self, key: &[u8]) -> Result<(), CheckpointError> {
        self.put(KEY_CHECKPOINT_PUBKEY, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_store() {
        let store = SledCheckpointStore::temporary().unwrap();
        assert_eq!(store.read_sync_checkpoint().unwrap(), None);
        assert_eq!(store.read_checkpoint_pubkey().unwrap(), None);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let hash = Hash256([0x42; 32]);

        {
            let store = SledCheckpointStore::open(temp_dir.path()).unwrap();
            store.write_sync_checkpoint(&hash).unwrap();
            store.write_checkpoint_pubkey(&[1, 2, 3]).unwrap();
        }

        let store = SledCheckpointStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.read_sync_checkpoint().unwrap(), Some(hash));
        assert_eq!(store.read_checkpoint_pubkey().unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_overwrite() {
        let store = SledCheckpointStore::temporary().unwrap();
        store.write_sync_checkpoint(&Hash256([1; 32])).unwrap();
        store.write_sync_checkpoint(&Hash256([2; 32])).unwrap();
        assert_eq!(store.read_sync_checkpoint().unwrap(), Some(Hash256([2; 32])));
    }

    #[test]
    fn test_corrupt_record() {
        let store = SledCheckpointStore::temporary().unwrap();
        store.put(KEY_SYNC_CHECKPOINT, &[1, 2, 3]).unwrap();
        assert!(matches!(
            store.read_sync_checkpoint(),
            Err(CheckpointError::Persistence(_))
        ));
    }
}
