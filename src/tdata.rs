//! Telegram Desktop folder codec
//!
//! Maps between a `tdata` folder and a [`SessionRecord`]. The folder holds
//! one encrypted key-material set plus one encrypted record per account;
//! this codec reads the first (primary) account and writes fresh
//! single-account folders.

use std::fs;
use std::path::Path;

use crate::api::ApiProfile;
use crate::crypto::{generate_local_key, generate_salt};
use crate::session::{AuthKey, SessionRecord};
use crate::storage::{self, MtpData};
use crate::{Error, Result};

/// Default key file name inside a tdata folder
const DEFAULT_KEY_FILE: &str = "data";

/// Read the primary account of a tdata folder
pub fn from_folder(path: &Path) -> Result<SessionRecord> {
    from_folder_with_passcode(path, "")
}

/// Read the primary account of a passcode-protected tdata folder
pub fn from_folder_with_passcode(path: &Path, passcode: &str) -> Result<SessionRecord> {
    if !path.exists() {
        return Err(Error::FolderNotFound {
            path: path.to_path_buf(),
        });
    }

    let key_data = storage::read_key_data(path, DEFAULT_KEY_FILE)?;
    let key_info = storage::decrypt_key_data(&key_data, passcode.as_bytes())?;

    let index = *key_info.account_indices.first().ok_or(Error::NoAccounts)?;
    let mtp = storage::read_mtp_data(path, index, &key_info.local_key, DEFAULT_KEY_FILE)?;

    tracing::info!(
        "loaded tdata account: dc_id={}, user_id={}",
        mtp.dc_id,
        mtp.user_id
    );

    Ok(SessionRecord::new(mtp.dc_id, AuthKey::from(mtp.auth_key)).with_user_id(mtp.user_id))
}

/// Write a record as a fresh single-account tdata folder under `<path>/tdata`
///
/// This format cannot omit the user id; the precondition is checked before
/// any file I/O so a failure leaves no partial folder behind. The profile is
/// pass-through device metadata.
pub fn to_folder(record: &SessionRecord, path: &Path, profile: &ApiProfile) -> Result<()> {
    let user_id = record
        .user_id()
        .filter(|id| *id != 0)
        .ok_or(Error::UserIdRequired)?;

    tracing::debug!(
        "writing tdata folder for {} (dc {})",
        profile.device_model(),
        record.dc_id()
    );

    let base = path.join("tdata");
    fs::create_dir_all(&base)?;

    let salt = generate_salt();
    let local_key = generate_local_key();
    storage::write_key_data(&base, DEFAULT_KEY_FILE, &salt, &local_key, b"")?;

    let mtp = MtpData {
        dc_id: record.dc_id(),
        user_id,
        auth_key: *record.auth_key().as_bytes(),
    };
    storage::write_mtp_data(&base, 0, &local_key, DEFAULT_KEY_FILE, &mtp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AUTH_KEY_SIZE;

    fn sample_record() -> SessionRecord {
        SessionRecord::new(2, AuthKey::from([0x63; AUTH_KEY_SIZE])).with_user_id(112233445)
    }

    #[test]
    fn test_folder_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        to_folder(&sample_record(), dir.path(), &ApiProfile::TELEGRAM_DESKTOP).unwrap();

        let decoded = from_folder(&dir.path().join("tdata")).unwrap();
        assert_eq!(decoded.dc_id(), 2);
        assert_eq!(decoded.user_id(), Some(112233445));
        assert_eq!(decoded.auth_key().as_bytes(), &[0x63; AUTH_KEY_SIZE]);
    }

    #[test]
    fn test_export_requires_user_id() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");

        let record = SessionRecord::new(2, AuthKey::from([0x63; AUTH_KEY_SIZE]));
        let err = to_folder(&record, &target, &ApiProfile::TELEGRAM_DESKTOP).unwrap_err();

        assert!(matches!(err, Error::UserIdRequired));
        // No partial folder on the failure path.
        assert!(!target.exists());
    }

    #[test]
    fn test_export_rejects_zero_sentinel_user_id() {
        let dir = tempfile::tempdir().unwrap();
        let record = SessionRecord::new(2, AuthKey::from([0x63; AUTH_KEY_SIZE])).with_user_id(0);

        assert!(matches!(
            to_folder(&record, dir.path(), &ApiProfile::TELEGRAM_DESKTOP).unwrap_err(),
            Error::UserIdRequired
        ));
    }

    #[test]
    fn test_missing_folder() {
        assert!(matches!(
            from_folder(Path::new("/no/such/tdata")).unwrap_err(),
            Error::FolderNotFound { .. }
        ));
    }

    #[test]
    fn test_folder_without_key_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            from_folder(dir.path()).unwrap_err(),
            Error::TdataFileNotFound { .. }
        ));
    }
}
