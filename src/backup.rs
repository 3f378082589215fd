//! Trust-center backup and restore.
//!
//! Export copies the extended PAN id and, for every populated link key
//! table entry, the partner's EUI64 together with a 16-byte hash of the
//! key.  The plaintext key never leaves the stack.  Import writes a backup
//! back into an idle stack's key table and starts forming the network on
//! the saved extended PAN id.
//!
//! Unlike scheduler faults these are recoverable statuses reported to the
//! caller, so they get their own error type.

use core::fmt;

use heapless::Vec;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{SecurityError, SecurityPort};

pub const EUI64_SIZE: usize = 8;
pub const KEY_SIZE: usize = 16;
/// Largest key table a backup can hold.
pub const MAX_BACKUP_KEYS: usize = 16;
/// Short id of the trust center.
pub const TRUST_CENTER_NODE_ID: u16 = 0x0000;

// ───────────────────────────────────────────────────────────────
// Backup image
// ───────────────────────────────────────────────────────────────

/// One exported link key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupKey {
    pub device_id: [u8; EUI64_SIZE],
    /// Hash of the link key, not the key itself.
    pub key: [u8; KEY_SIZE],
}

/// A trust-center backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupData {
    pub extended_pan_id: [u8; EUI64_SIZE],
    pub keys: Vec<BackupKey, MAX_BACKUP_KEYS>,
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupError {
    /// The stack's key table is larger than a backup can hold.
    TableFull,
    /// Only the trust center can export.
    NotTrustCenter,
    /// Import needs the network to be down.
    NetworkUp,
    /// The backup has more keys than the stack's key table.
    TooManyKeys { table: u8, backup: u8 },
    /// Writing (or erasing) a key table entry failed.
    KeyWrite { index: u8, erase: bool },
    /// Network formation could not be started.
    FormFailed,
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull => write!(f, "key table larger than backup capacity ({MAX_BACKUP_KEYS})"),
            Self::NotTrustCenter => write!(f, "not the trust center"),
            Self::NetworkUp => write!(f, "cannot import while the network is up"),
            Self::TooManyKeys { table, backup } => {
                write!(f, "key table of {table} too small for backup of {backup}")
            }
            Self::KeyWrite { index, erase } => {
                let op = if *erase { "erase" } else { "set" };
                write!(f, "failed to {op} key table entry {index}")
            }
            Self::FormFailed => write!(f, "failed to start network formation"),
        }
    }
}

impl std::error::Error for BackupError {}

// ───────────────────────────────────────────────────────────────
// Export / import
// ───────────────────────────────────────────────────────────────

/// 16-byte digest stored in place of a link key.
pub fn hash_key(key: &[u8; KEY_SIZE]) -> [u8; KEY_SIZE] {
    let digest = hmac_sha256::Hash::hash(key);
    let mut out = [0u8; KEY_SIZE];
    out.copy_from_slice(&digest[..KEY_SIZE]);
    out
}

/// Snapshot the trust center's key table.
pub fn export_backup(port: &impl SecurityPort) -> Result<BackupData, BackupError> {
    let table_size = port.key_table_size();
    if table_size as usize > MAX_BACKUP_KEYS {
        return Err(BackupError::TableFull);
    }
    if port.node_id() != TRUST_CENTER_NODE_ID {
        return Err(BackupError::NotTrustCenter);
    }

    let mut backup = BackupData {
        extended_pan_id: port.extended_pan_id(),
        keys: Vec::new(),
    };
    for index in 0..table_size {
        if let Some((device_id, key)) = port.export_link_key(index) {
            backup
                .keys
                .push(BackupKey {
                    device_id,
                    key: hash_key(&key),
                })
                .map_err(|_| BackupError::TableFull)?;
        }
    }
    info!("Backup: exported {} key(s)", backup.keys.len());
    Ok(backup)
}

/// Restore `backup` into the key table and start forming the network.
///
/// Entries past the backup's key count are erased.
pub fn import_backup(port: &mut impl SecurityPort, backup: &BackupData) -> Result<(), BackupError> {
    if port.network_up() {
        warn!("Backup: cannot import TC data while network is up");
        return Err(BackupError::NetworkUp);
    }
    let table_size = port.key_table_size();
    let count = backup.keys.len();
    if count > table_size as usize {
        error!("Backup: key table of {} too small for import of {}", table_size, count);
        return Err(BackupError::TooManyKeys {
            table: table_size,
            backup: count as u8,
        });
    }

    for index in 0..table_size {
        let result: Result<(), SecurityError> = match backup.keys.get(index as usize) {
            Some(entry) => port.import_link_key(index, &entry.device_id, &entry.key),
            None => port.erase_link_key(index),
        };
        if let Err(e) = result {
            let erase = index as usize >= count;
            error!("Backup: key table entry {} failed: {}", index, e);
            return Err(BackupError::KeyWrite { index, erase });
        }
    }
    info!("Backup: imported {} key(s)", count);

    port.preserve_keys_on_form();
    info!("Backup: searching for unused PAN id");
    port.form_network(&backup.extended_pan_id).map_err(|e| {
        error!("Backup: form failed: {}", e);
        BackupError::FormFailed
    })
}
