//! File-backed durable store.
//!
//! Each slot is one file in the store directory, named by the hex of its key.
//! Slot file layout:
//!
//! ```text
//! magic "CRT\0" | version u8 | length u64 LE | payload | crc32 u32 LE
//! ```

use super::DurableStore;
use crate::error::{CartError, Result};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic bytes for slot files.
const SLOT_MAGIC: &[u8; 4] = b"CRT\0";

/// Current slot format version.
const SLOT_VERSION: u8 = 1;

/// File store configuration.
#[derive(Clone, Debug)]
pub struct FileStoreConfig {
    /// Directory holding the slot files.
    pub path: PathBuf,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./cart-store"),
            create_if_missing: true,
        }
    }
}

/// Durable store keeping one framed file per slot.
///
/// Holds an exclusive lock on the directory for its lifetime.
pub struct FileDurableStore {
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Serializes writers within the process.
    write_lock: Mutex<()>,
}

impl FileDurableStore {
    /// Open the store directory, creating it if configured to.
    pub fn open(config: FileStoreConfig) -> Result<Self> {
        if !config.path.exists() {
            if !config.create_if_missing {
                return Err(CartError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Store directory {} does not exist", config.path.display()),
                )));
            }
            fs::create_dir_all(&config.path)?;
        }

        let lock_file = Self::acquire_lock(&config.path)?;

        Ok(Self {
            path: config.path,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the file backing a slot.
    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{}.slot", hex::encode(key.as_bytes())))
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| CartError::Locked)?;

        Ok(lock_file)
    }

    fn read_slot(path: &Path) -> Result<String> {
        let mut file = File::open(path)?;

        // Read and verify magic
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != SLOT_MAGIC {
            return Err(CartError::InvalidFormat("Invalid slot magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != SLOT_VERSION {
            return Err(CartError::InvalidFormat(format!(
                "Unsupported slot version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);

        let expected_len = file.metadata()?.len();
        if len.saturating_add(4 + 8 + 1 + 4) != expected_len {
            return Err(CartError::Corruption(format!(
                "Slot length {} does not match file size {}",
                len, expected_len
            )));
        }

        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&payload);
        if stored != computed {
            return Err(CartError::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                stored, computed
            )));
        }

        String::from_utf8(payload).map_err(|e| CartError::Corruption(e.to_string()))
    }
}

impl DurableStore for FileDurableStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_slot(&path).map(Some)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _lock = self.write_lock.lock();

        let path = self.slot_path(key);
        let tmp_path = path.with_extension("slot.tmp");
        let payload = value.as_bytes();

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(SLOT_MAGIC)?;
            file.write_all(&[SLOT_VERSION])?;
            file.write_all(&(payload.len() as u64).to_le_bytes())?;
            file.write_all(payload)?;
            file.write_all(&crc32fast::hash(payload).to_le_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &path)?;
        debug!(key, bytes = payload.len(), "Wrote slot");

        Ok(())
    }
}
