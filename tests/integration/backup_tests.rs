//! Trust-center backup export and import against a mock key table.

use af_events::app::ports::SecurityError;
use af_events::backup::{BackupData, BackupError, MAX_BACKUP_KEYS, export_backup, hash_key, import_backup};

use crate::mock_ports::{KeyCall, MockSecurity};

const DEV_A: [u8; 8] = [0xA0, 1, 2, 3, 4, 5, 6, 7];
const DEV_B: [u8; 8] = [0xB0, 1, 2, 3, 4, 5, 6, 7];
const KEY_A: [u8; 16] = [0x11; 16];
const KEY_B: [u8; 16] = [0x22; 16];

fn populated() -> MockSecurity {
    let mut tc = MockSecurity::trust_center(4);
    tc.table[0] = Some((DEV_A, KEY_A));
    tc.table[2] = Some((DEV_B, KEY_B));
    tc.network_up = true;
    tc
}

// ── Export ────────────────────────────────────────────────────

#[test]
fn export_hashes_populated_entries() {
    let tc = populated();
    let backup = export_backup(&tc).unwrap();

    assert_eq!(backup.extended_pan_id, tc.extended_pan_id);
    assert_eq!(backup.keys.len(), 2);
    assert_eq!(backup.keys[0].device_id, DEV_A);
    assert_eq!(backup.keys[0].key, hash_key(&KEY_A));
    assert_ne!(backup.keys[0].key, KEY_A);
    assert_eq!(backup.keys[1].device_id, DEV_B);
}

#[test]
fn export_requires_trust_center() {
    let mut tc = populated();
    tc.node_id = 0x1234;
    assert_eq!(export_backup(&tc), Err(BackupError::NotTrustCenter));
}

#[test]
fn export_rejects_oversized_table() {
    let tc = MockSecurity::trust_center(MAX_BACKUP_KEYS + 1);
    assert_eq!(export_backup(&tc), Err(BackupError::TableFull));
}

// ── Import ────────────────────────────────────────────────────

#[test]
fn import_writes_keys_erases_rest_then_forms() {
    let backup = export_backup(&populated()).unwrap();
    let mut fresh = MockSecurity::trust_center(3);

    import_backup(&mut fresh, &backup).unwrap();

    assert_eq!(
        fresh.calls,
        [
            KeyCall::Import { index: 0, device_id: DEV_A, key: hash_key(&KEY_A) },
            KeyCall::Import { index: 1, device_id: DEV_B, key: hash_key(&KEY_B) },
            KeyCall::Erase { index: 2 },
            KeyCall::Preserve,
            KeyCall::Form { extended_pan_id: backup.extended_pan_id },
        ]
    );
}

#[test]
fn import_refused_while_network_up() {
    let backup = BackupData::default();
    let mut tc = populated();
    assert_eq!(import_backup(&mut tc, &backup), Err(BackupError::NetworkUp));
    assert!(tc.calls.is_empty());
}

#[test]
fn import_rejects_backup_larger_than_table() {
    let backup = export_backup(&populated()).unwrap();
    let mut small = MockSecurity::trust_center(1);
    assert_eq!(
        import_backup(&mut small, &backup),
        Err(BackupError::TooManyKeys { table: 1, backup: 2 })
    );
}

#[test]
fn import_stops_at_failed_erase() {
    let backup = export_backup(&populated()).unwrap();
    let mut fresh = MockSecurity::trust_center(4);
    fresh.fail_at = Some(3);

    assert_eq!(
        import_backup(&mut fresh, &backup),
        Err(BackupError::KeyWrite { index: 3, erase: true })
    );
    assert!(!fresh.calls.contains(&KeyCall::Preserve));
}

#[test]
fn import_reports_form_failure() {
    let backup = export_backup(&populated()).unwrap();
    let mut fresh = MockSecurity::trust_center(2);
    fresh.form_result = Err(SecurityError::Rejected);
    assert_eq!(import_backup(&mut fresh, &backup), Err(BackupError::FormFailed));
}
