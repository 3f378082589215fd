//! Fuzz target: `BackupData` postcard decoding
//!
//! Backups come back from external storage, so decoding must reject
//! malformed bytes instead of panicking.  Checks:
//! - No panics under arbitrary byte inputs
//! - A decoded backup never holds more than `MAX_BACKUP_KEYS` keys
//! - Re-encoding a decoded backup decodes to the same value
//!
//! cargo fuzz run fuzz_backup_decode

#![no_main]

use af_events::backup::{BackupData, MAX_BACKUP_KEYS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(backup) = postcard::from_bytes::<BackupData>(data) else {
        return;
    };
    assert!(backup.keys.len() <= MAX_BACKUP_KEYS);

    let bytes = postcard::to_allocvec(&backup).expect("re-encode");
    let again: BackupData = postcard::from_bytes(&bytes).expect("decode re-encoded");
    assert_eq!(again, backup);
});
