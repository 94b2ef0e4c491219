//! tdata file plumbing
//!
//! Reads and writes the container files inside a tdata folder: the TDF$
//! descriptor framing, the key file holding the (passcode-wrapped) local
//! key plus account indices, and the per-account MTP authorization data.

use std::fs;
use std::path::Path;

use md5::{Digest, Md5};

use crate::crypto::{create_local_key, decrypt_local, encrypt_local};
use crate::qstream::{QtReader, QtWriter};
use crate::session::AuthKey;
use crate::{Error, Result, AUTH_KEY_SIZE};

/// Magic bytes at the start of tdata files ("TDF$")
const TDATA_MAGIC: [u8; 4] = [0x54, 0x44, 0x46, 0x24];

/// App version stamped into files we write (4.8.0)
const TDATA_WRITE_VERSION: u32 = 4_008_000;

/// Maximum number of accounts supported by Telegram Desktop
const MAX_ACCOUNTS: i32 = 3;

/// dbi block id carrying the MTP authorization payload
const DBI_MTP_AUTHORIZATION: i32 = 0x4B;

/// Special tag selecting the wide (64-bit) user id layout
const K_WIDE_IDS_TAG: i64 = !0i64;

/// A decoded tdata file: version header plus payload
#[derive(Debug)]
pub struct FileDescriptor {
    pub version: u32,
    pub data: Vec<u8>,
}

/// Read a tdata file, trying the main name first, then the "s" backup
pub fn read_file(name: &str, base_path: &Path) -> Result<FileDescriptor> {
    let path = base_path.join(name);
    let path_s = base_path.join(format!("{name}s"));

    // Use is_file() to skip directories
    let file_data = if path.is_file() {
        tracing::debug!("reading {:?}", path);
        fs::read(&path)?
    } else if path_s.is_file() {
        tracing::debug!("reading backup {:?}", path_s);
        fs::read(&path_s)?
    } else {
        return Err(Error::TdataFileNotFound {
            file: name.to_string(),
            folder: base_path.to_path_buf(),
        });
    };

    parse_file_descriptor(&file_data)
}

/// Write a tdata file with descriptor framing
pub fn write_file(name: &str, base_path: &Path, data: &[u8]) -> Result<()> {
    let mut out = Vec::with_capacity(8 + data.len() + 16);
    out.extend_from_slice(&TDATA_MAGIC);
    out.extend_from_slice(&TDATA_WRITE_VERSION.to_le_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&descriptor_md5(data, TDATA_WRITE_VERSION));

    let path = base_path.join(name);
    fs::write(&path, out)?;
    tracing::debug!("wrote {:?} ({} payload bytes)", path, data.len());
    Ok(())
}

/// Parse descriptor framing
///
/// Layout:
/// - bytes[0..4]: magic "TDF$"
/// - bytes[4..8]: version (little endian)
/// - bytes[8..len-16]: payload
/// - bytes[len-16..]: MD5 over (payload + payload size + version + magic)
fn parse_file_descriptor(data: &[u8]) -> Result<FileDescriptor> {
    if data.len() < 8 + 16 {
        return Err(Error::invalid_format("tdata file too short"));
    }

    if data[0..4] != TDATA_MAGIC {
        return Err(Error::invalid_format("invalid tdata file magic"));
    }

    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

    let payload = &data[8..data.len() - 16];
    let file_md5 = &data[data.len() - 16..];

    if file_md5 != descriptor_md5(payload, version).as_slice() {
        return Err(Error::ChecksumMismatch);
    }

    Ok(FileDescriptor {
        version,
        data: payload.to_vec(),
    })
}

fn descriptor_md5(payload: &[u8], version: u32) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(payload);
    hasher.update((payload.len() as u32).to_le_bytes());
    hasher.update(version.to_le_bytes());
    hasher.update(TDATA_MAGIC);
    hasher.finalize().into()
}

/// Raw contents of the key file
#[derive(Debug)]
pub struct KeyData {
    pub salt: Vec<u8>,
    pub key_encrypted: Vec<u8>,
    pub info_encrypted: Vec<u8>,
    pub version: u32,
}

/// Read the key file (`key_data` for the default key file name)
pub fn read_key_data(base_path: &Path, key_file: &str) -> Result<KeyData> {
    let name = format!("key_{key_file}");
    let file = read_file(&name, base_path)?;

    let mut stream = QtReader::new(&file.data);
    let salt = stream.read_qbytearray()?;
    let key_encrypted = stream.read_qbytearray()?;
    let info_encrypted = stream.read_qbytearray()?;

    Ok(KeyData {
        salt,
        key_encrypted,
        info_encrypted,
        version: file.version,
    })
}

/// Decrypted key info: the local key plus which account slots are in use
#[derive(Debug)]
pub struct KeyInfo {
    pub local_key: AuthKey,
    pub account_indices: Vec<i32>,
}

/// Decrypt the key file contents
pub fn decrypt_key_data(key_data: &KeyData, passcode: &[u8]) -> Result<KeyInfo> {
    let passcode_key = create_local_key(&key_data.salt, passcode);

    let decrypted_key = decrypt_local(&key_data.key_encrypted, &passcode_key)?;
    if decrypted_key.len() < AUTH_KEY_SIZE {
        return Err(Error::invalid_format(format!(
            "decrypted local key too short: {} bytes",
            decrypted_key.len()
        )));
    }
    let local_key = AuthKey::from_bytes(&decrypted_key[..AUTH_KEY_SIZE])?;

    let decrypted_info = decrypt_local(&key_data.info_encrypted, &local_key)?;
    let mut info_stream = QtReader::new(&decrypted_info);

    let count = info_stream.read_i32()?;
    if count <= 0 || count > MAX_ACCOUNTS {
        return Err(Error::invalid_format(format!(
            "invalid account count: {count}"
        )));
    }

    let mut account_indices = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = info_stream.read_i32()?;
        if (0..MAX_ACCOUNTS).contains(&index) {
            account_indices.push(index);
        }
    }

    Ok(KeyInfo {
        local_key,
        account_indices,
    })
}

/// Write the key file for a fresh single-account folder
pub fn write_key_data(
    base_path: &Path,
    key_file: &str,
    salt: &[u8],
    local_key: &AuthKey,
    passcode: &[u8],
) -> Result<()> {
    let passcode_key = create_local_key(salt, passcode);
    let key_encrypted = encrypt_local(local_key.as_bytes(), &passcode_key);

    // Account info: one account in slot 0.
    let mut info = QtWriter::new();
    info.put_i32(1);
    info.put_i32(0);
    let info_encrypted = encrypt_local(&info.into_bytes(), local_key);

    let mut payload = QtWriter::new();
    payload.put_qbytearray(salt);
    payload.put_qbytearray(&key_encrypted);
    payload.put_qbytearray(&info_encrypted);

    write_file(&format!("key_{key_file}"), base_path, &payload.into_bytes())
}

/// MTP authorization data for one account
#[derive(Debug)]
pub struct MtpData {
    pub dc_id: i32,
    pub user_id: i64,
    pub auth_key: [u8; AUTH_KEY_SIZE],
}

/// Read and decrypt one account's MTP data file
pub fn read_mtp_data(
    base_path: &Path,
    index: i32,
    local_key: &AuthKey,
    key_file: &str,
) -> Result<MtpData> {
    let file_name = account_data_file_name(key_file, index);
    tracing::debug!("looking for MTP data in {}", file_name);

    let file = read_file(&file_name, base_path)?;

    let mut stream = QtReader::new(&file.data);
    let encrypted = stream.read_qbytearray()?;
    let decrypted = decrypt_local(&encrypted, local_key)?;

    parse_mtp_authorization(&decrypted)
}

/// Encrypt and write one account's MTP data file
pub fn write_mtp_data(
    base_path: &Path,
    index: i32,
    local_key: &AuthKey,
    key_file: &str,
    mtp: &MtpData,
) -> Result<()> {
    let encrypted = encrypt_local(&serialize_mtp_authorization(mtp), local_key);

    let mut payload = QtWriter::new();
    payload.put_qbytearray(&encrypted);

    write_file(
        &account_data_file_name(key_file, index),
        base_path,
        &payload.into_bytes(),
    )
}

/// Name of the data file for an account slot
///
/// The name is the hex form of the low 64 bits of MD5 over "data" (slot 0)
/// or "data#N" (slot N-1).
fn account_data_file_name(key_file: &str, index: i32) -> String {
    let base = key_file.replace('#', "");
    let data_name = if index > 0 {
        format!("{}#{}", base, index + 1)
    } else {
        base
    };

    let mut hasher = Md5::new();
    hasher.update(data_name.as_bytes());
    let digest: [u8; 16] = hasher.finalize().into();

    let key = u64::from_le_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ]);
    to_file_part(key)
}

/// Convert a file key to its 16-character hex file name (low nibble first)
fn to_file_part(val: u64) -> String {
    let mut result = String::with_capacity(16);
    let mut v = val;

    for _ in 0..16 {
        let nibble = (v & 0x0F) as u8;
        let c = if nibble < 0x0A {
            (b'0' + nibble) as char
        } else {
            (b'A' + (nibble - 0x0A)) as char
        };
        result.push(c);
        v >>= 4;
    }

    result
}

/// Parse decrypted MTP authorization bytes
///
/// Layout:
/// - qint32 block id (must be dbi.MtpAuthorization = 0x4B)
/// - QByteArray holding the serialized authorization:
///   - qint32 userId, qint32 mainDcId (legacy), or kWideIdsTag followed by
///     qint64 userId + qint32 mainDcId
///   - qint32 key count, then per key: qint32 dcId + 256 raw key bytes
///   - qint32 keys-to-destroy count (ignored)
fn parse_mtp_authorization(data: &[u8]) -> Result<MtpData> {
    let mut stream = QtReader::new(data);

    let block_id = stream.read_i32()?;
    if block_id != DBI_MTP_AUTHORIZATION {
        return Err(Error::invalid_format(format!(
            "expected MtpAuthorization block (0x4B), got 0x{block_id:02X}"
        )));
    }

    let serialized = stream.read_qbytearray()?;
    let mut auth_stream = QtReader::new(&serialized);

    let first_int = auth_stream.read_i32()?;
    let second_int = auth_stream.read_i32()?;

    let combined = ((first_int as i64) << 32) | (second_int as u32 as i64);
    let (user_id, main_dc_id) = if combined == K_WIDE_IDS_TAG {
        let uid = auth_stream.read_i64()?;
        let dc = auth_stream.read_i32()?;
        (uid, dc)
    } else {
        (first_int as i64, second_int)
    };

    tracing::debug!("MTP auth: user_id={}, main_dc_id={}", user_id, main_dc_id);

    let keys_count = auth_stream.read_i32()?;
    if !(0..=10).contains(&keys_count) {
        return Err(Error::invalid_format(format!(
            "invalid keys count: {keys_count}"
        )));
    }

    let mut auth_key: Option<[u8; AUTH_KEY_SIZE]> = None;
    for _ in 0..keys_count {
        let dc_id = auth_stream.read_i32()?;
        let key_bytes = auth_stream.read_raw(AUTH_KEY_SIZE)?;

        if dc_id == main_dc_id {
            let mut key = [0u8; AUTH_KEY_SIZE];
            key.copy_from_slice(&key_bytes);
            auth_key = Some(key);
        }
    }

    let auth_key = auth_key.ok_or_else(|| {
        Error::invalid_format(format!("no auth key found for main DC {main_dc_id}"))
    })?;

    Ok(MtpData {
        dc_id: main_dc_id,
        user_id,
        auth_key,
    })
}

/// Serialize MTP authorization bytes (wide user id layout)
fn serialize_mtp_authorization(mtp: &MtpData) -> Vec<u8> {
    let mut auth = QtWriter::new();
    // Wide tag spans both legacy int slots.
    auth.put_i32(-1);
    auth.put_i32(-1);
    auth.put_i64(mtp.user_id);
    auth.put_i32(mtp.dc_id);
    auth.put_i32(1);
    auth.put_i32(mtp.dc_id);
    auth.put_raw(&mtp.auth_key);
    auth.put_i32(0); // keys to destroy

    let mut outer = QtWriter::new();
    outer.put_i32(DBI_MTP_AUTHORIZATION);
    outer.put_qbytearray(&auth.into_bytes());
    outer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{generate_local_key, generate_salt};

    #[test]
    fn test_file_descriptor_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_file("test", dir.path(), &[1, 2, 3, 4, 5]).unwrap();

        let file = read_file("test", dir.path()).unwrap();
        assert_eq!(file.data, vec![1, 2, 3, 4, 5]);
        assert_eq!(file.version, TDATA_WRITE_VERSION);
    }

    #[test]
    fn test_file_descriptor_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        write_file("test", dir.path(), &[1, 2, 3, 4, 5]).unwrap();

        let path = dir.path().join("test");
        let mut raw = fs::read(&path).unwrap();
        raw[9] ^= 0xFF;
        fs::write(&path, raw).unwrap();

        assert!(matches!(
            read_file("test", dir.path()).unwrap_err(),
            Error::ChecksumMismatch
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_file("absent", dir.path()).unwrap_err(),
            Error::TdataFileNotFound { .. }
        ));
    }

    #[test]
    fn test_backup_suffix_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write_file("datas", dir.path(), &[9]).unwrap();

        let file = read_file("data", dir.path()).unwrap();
        assert_eq!(file.data, vec![9]);
    }

    #[test]
    fn test_key_data_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let salt = generate_salt();
        let local_key = generate_local_key();

        write_key_data(dir.path(), "data", &salt, &local_key, b"").unwrap();

        let key_data = read_key_data(dir.path(), "data").unwrap();
        assert_eq!(key_data.salt, salt);

        let info = decrypt_key_data(&key_data, b"").unwrap();
        assert_eq!(info.local_key.as_bytes(), local_key.as_bytes());
        assert_eq!(info.account_indices, vec![0]);
    }

    #[test]
    fn test_key_data_wrong_passcode() {
        let dir = tempfile::tempdir().unwrap();
        let salt = generate_salt();
        let local_key = generate_local_key();

        write_key_data(dir.path(), "data", &salt, &local_key, b"secret").unwrap();

        let key_data = read_key_data(dir.path(), "data").unwrap();
        assert!(decrypt_key_data(&key_data, b"wrong").is_err());
        assert!(decrypt_key_data(&key_data, b"secret").is_ok());
    }

    #[test]
    fn test_mtp_data_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let local_key = generate_local_key();

        let mtp = MtpData {
            dc_id: 2,
            user_id: 112233445,
            auth_key: [0x63; AUTH_KEY_SIZE],
        };
        write_mtp_data(dir.path(), 0, &local_key, "data", &mtp).unwrap();

        let read_back = read_mtp_data(dir.path(), 0, &local_key, "data").unwrap();
        assert_eq!(read_back.dc_id, 2);
        assert_eq!(read_back.user_id, 112233445);
        assert_eq!(read_back.auth_key, [0x63; AUTH_KEY_SIZE]);
    }

    #[test]
    fn test_legacy_narrow_ids_parse() {
        // Legacy layout: qint32 userId, qint32 mainDcId, one key.
        let mut auth = QtWriter::new();
        auth.put_i32(123456);
        auth.put_i32(4);
        auth.put_i32(1);
        auth.put_i32(4);
        auth.put_raw(&[0xAB; AUTH_KEY_SIZE]);
        auth.put_i32(0);

        let mut outer = QtWriter::new();
        outer.put_i32(DBI_MTP_AUTHORIZATION);
        outer.put_qbytearray(&auth.into_bytes());

        let mtp = parse_mtp_authorization(&outer.into_bytes()).unwrap();
        assert_eq!(mtp.user_id, 123456);
        assert_eq!(mtp.dc_id, 4);
        assert_eq!(mtp.auth_key, [0xAB; AUTH_KEY_SIZE]);
    }

    #[test]
    fn test_wrong_block_id_rejected() {
        let mut outer = QtWriter::new();
        outer.put_i32(0x10);
        outer.put_qbytearray(&[]);

        assert!(parse_mtp_authorization(&outer.into_bytes()).is_err());
    }

    #[test]
    fn test_account_data_file_name_stable() {
        // Slot 0 uses "data"; further slots append "#N".
        let name0 = account_data_file_name("data", 0);
        let name1 = account_data_file_name("data", 1);
        assert_eq!(name0.len(), 16);
        assert_ne!(name0, name1);
        assert_eq!(name0, account_data_file_name("data", 0));
    }
}
