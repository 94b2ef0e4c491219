//! Pyrogram session codec
//!
//! Two representations: a compact base64 session string and a single-file
//! SQLite database. The string has three historical packed layouts which are
//! told apart by decoded byte length alone; the table below is the complete
//! dispatch contract.
//!
//! All multi-byte integers are big-endian.

use std::io::{Cursor, Read};
use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use byteorder::{BigEndian, ReadBytesExt};
use rusqlite::{params, OptionalExtension};

use crate::db::{self, TableSpec};
use crate::session::{AuthKey, SessionRecord};
use crate::{Error, Result, AUTH_KEY_SIZE};

/// One historical packed layout of the session string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StringLayout {
    /// Exact decoded byte length that selects this layout
    decoded_len: usize,
    /// Layout carries a 32-bit api_id between dc_id and test_mode
    has_api_id: bool,
    /// user_id is 64-bit rather than 32-bit
    wide_user_id: bool,
}

/// dc_id(1) + test_mode(1) + auth_key(256) + user_id(4) + is_bot(1)
const OLD_STRING_32: StringLayout = StringLayout {
    decoded_len: 263,
    has_api_id: false,
    wide_user_id: false,
};

/// dc_id(1) + test_mode(1) + auth_key(256) + user_id(8) + is_bot(1)
const OLD_STRING_64: StringLayout = StringLayout {
    decoded_len: 267,
    has_api_id: false,
    wide_user_id: true,
};

/// dc_id(1) + api_id(4) + test_mode(1) + auth_key(256) + user_id(8) + is_bot(1)
const CURRENT_STRING: StringLayout = StringLayout {
    decoded_len: 271,
    has_api_id: true,
    wide_user_id: true,
};

/// Checked in priority order: the two legacy layouts first, then the current
/// one. These three lengths are the only ones ever observed in the wild; any
/// other length is rejected, not guessed at.
const STRING_LAYOUTS: [StringLayout; 3] = [OLD_STRING_32, OLD_STRING_64, CURRENT_STRING];

const EXPECTED_LENGTHS: &str = "263, 267 or 271";

fn detect_layout(decoded_len: usize) -> Option<StringLayout> {
    STRING_LAYOUTS
        .iter()
        .find(|layout| layout.decoded_len == decoded_len)
        .copied()
}

/// Decode a Pyrogram session string
///
/// Base64 padding is optional on input. Legacy strings have no api_id field
/// and leave it unset on the record.
pub fn from_string(token: &str) -> Result<SessionRecord> {
    let decoded = URL_SAFE_NO_PAD
        .decode(token.trim_end_matches('='))
        .map_err(|_| Error::invalid_format("session string is not valid base64"))?;

    let layout = detect_layout(decoded.len()).ok_or(Error::UnexpectedStringLength {
        len: decoded.len(),
        expected: EXPECTED_LENGTHS,
    })?;

    tracing::debug!("decoded {} bytes, layout {:?}", decoded.len(), layout);

    let mut cursor = Cursor::new(decoded.as_slice());
    let dc_id = cursor.read_u8()? as i32;
    let api_id = if layout.has_api_id {
        Some(cursor.read_u32::<BigEndian>()? as i32)
    } else {
        None
    };
    let test_mode = cursor.read_u8()? != 0;

    let mut key = [0u8; AUTH_KEY_SIZE];
    cursor.read_exact(&mut key)?;

    let user_id = if layout.wide_user_id {
        cursor.read_u64::<BigEndian>()? as i64
    } else {
        cursor.read_u32::<BigEndian>()? as i64
    };
    let is_bot = cursor.read_u8()? != 0;

    Ok(SessionRecord::new(dc_id, AuthKey::from(key))
        .with_api_id(api_id)
        .with_test_mode(test_mode)
        .with_user_id(user_id)
        .with_bot(is_bot))
}

/// Encode a record as a Pyrogram session string
///
/// Always emits the current layout, with padding stripped. Unset user_id and
/// api_id are written as the zero sentinel; the unset/zero distinction does
/// not survive this format.
pub fn to_string(record: &SessionRecord) -> String {
    let mut data = Vec::with_capacity(CURRENT_STRING.decoded_len);
    data.push(record.dc_id() as u8);
    data.extend_from_slice(&(record.api_id().unwrap_or(0) as u32).to_be_bytes());
    data.push(record.test_mode() as u8);
    data.extend_from_slice(record.auth_key().as_bytes());
    data.extend_from_slice(&(record.user_id().unwrap_or(0) as u64).to_be_bytes());
    data.push(record.is_bot() as u8);

    URL_SAFE_NO_PAD.encode(data)
}

const SCHEMA: &str = r#"
CREATE TABLE sessions (
    dc_id     INTEGER PRIMARY KEY,
    api_id    INTEGER,
    test_mode INTEGER,
    auth_key  BLOB,
    date      INTEGER NOT NULL,
    user_id   INTEGER,
    is_bot    INTEGER
);

CREATE TABLE peers (
    id             INTEGER PRIMARY KEY,
    access_hash    INTEGER,
    type           INTEGER NOT NULL,
    username       TEXT,
    phone_number   TEXT,
    last_update_on INTEGER NOT NULL DEFAULT (CAST(STRFTIME('%s', 'now') AS INTEGER))
);

CREATE TABLE version (
    number INTEGER PRIMARY KEY
);

CREATE INDEX idx_peers_id ON peers (id);
CREATE INDEX idx_peers_username ON peers (username);
CREATE INDEX idx_peers_phone_number ON peers (phone_number);

CREATE TRIGGER trg_peers_last_update_on
    AFTER UPDATE
    ON peers
BEGIN
    UPDATE peers
    SET last_update_on = CAST(STRFTIME('%s', 'now') AS INTEGER)
    WHERE id = NEW.id;
END;
"#;

/// Schema version stamped into new files (Pyrogram v2 storage)
const SCHEMA_VERSION: i64 = 5;

/// Table and column sets other Pyrogram implementations expect verbatim
const TABLES: &[TableSpec] = &[
    (
        "sessions",
        &["dc_id", "api_id", "test_mode", "auth_key", "date", "user_id", "is_bot"],
    ),
    (
        "peers",
        &["id", "access_hash", "type", "username", "phone_number", "last_update_on"],
    ),
    ("version", &["number"]),
];

/// Read a Pyrogram SQLite session file
pub fn from_file(path: &Path) -> Result<SessionRecord> {
    let conn = db::open_validated(path, TABLES)?;

    let row = conn
        .query_row(
            "SELECT dc_id, api_id, test_mode, auth_key, user_id, is_bot FROM sessions",
            [],
            |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, Option<i32>>(1)?,
                    row.get::<_, Option<bool>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<bool>>(5)?,
                ))
            },
        )
        .optional()?;

    let (dc_id, api_id, test_mode, key, user_id, is_bot) =
        row.ok_or_else(|| Error::InvalidSessionFile {
            path: path.to_path_buf(),
        })?;

    Ok(SessionRecord::new(dc_id, AuthKey::from_bytes(&key)?)
        .with_api_id(api_id)
        .with_test_mode(test_mode.unwrap_or(false))
        .with_user_id(user_id)
        .with_bot(is_bot.unwrap_or(false)))
}

/// Write a Pyrogram SQLite session file
///
/// Creates the schema fresh and inserts a single sessions row; the peers
/// cache stays empty. Fails if the path already holds these tables.
pub fn to_file(record: &SessionRecord, path: &Path) -> Result<()> {
    let conn = db::create(path)?;
    conn.execute_batch(SCHEMA)?;

    conn.execute(
        "INSERT INTO sessions VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.dc_id(),
            record.api_id(),
            record.test_mode(),
            record.auth_key().as_bytes().as_slice(),
            chrono::Utc::now().timestamp(),
            record.user_id().unwrap_or(0),
            record.is_bot(),
        ],
    )?;
    conn.execute("INSERT INTO version VALUES (?1)", [SCHEMA_VERSION])?;

    tracing::debug!("wrote pyrogram session file: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SessionRecord {
        SessionRecord::new(2, AuthKey::from([0x63; AUTH_KEY_SIZE]))
            .with_user_id(112233445)
            .with_api_id(12345)
            .with_bot(false)
            .with_test_mode(false)
    }

    #[test]
    fn test_layout_sizes_cover_field_widths() {
        for layout in STRING_LAYOUTS {
            let expected = 1
                + if layout.has_api_id { 4 } else { 0 }
                + 1
                + AUTH_KEY_SIZE
                + if layout.wide_user_id { 8 } else { 4 }
                + 1;
            assert_eq!(layout.decoded_len, expected);
        }
    }

    #[test]
    fn test_layout_detection() {
        assert_eq!(detect_layout(263), Some(OLD_STRING_32));
        assert_eq!(detect_layout(267), Some(OLD_STRING_64));
        assert_eq!(detect_layout(271), Some(CURRENT_STRING));
        assert_eq!(detect_layout(264), None);
        assert_eq!(detect_layout(0), None);
    }

    #[test]
    fn test_string_round_trip() {
        let token = to_string(&sample_record());
        let decoded = from_string(&token).unwrap();

        assert_eq!(decoded.dc_id(), 2);
        assert_eq!(decoded.auth_key().as_bytes(), &[0x63; AUTH_KEY_SIZE]);
        assert_eq!(decoded.user_id(), Some(112233445));
        assert_eq!(decoded.api_id(), Some(12345));
        assert!(!decoded.is_bot());
        assert!(!decoded.test_mode());
    }

    #[test]
    fn test_string_round_trip_bot_test_mode() {
        let record = SessionRecord::new(1, AuthKey::from([9; AUTH_KEY_SIZE]))
            .with_user_id(7)
            .with_bot(true)
            .with_test_mode(true);
        let decoded = from_string(&to_string(&record)).unwrap();

        assert!(decoded.is_bot());
        assert!(decoded.test_mode());
    }

    #[test]
    fn test_unset_ids_become_zero_sentinels() {
        let record = SessionRecord::new(4, AuthKey::from([1; AUTH_KEY_SIZE]));
        let decoded = from_string(&to_string(&record)).unwrap();

        assert_eq!(decoded.user_id(), Some(0));
        assert!(!decoded.has_user_id());
        assert_eq!(decoded.api_id(), Some(0));
    }

    #[test]
    fn test_padding_optional_on_decode() {
        let token = to_string(&sample_record());
        assert!(!token.ends_with('='));
        let padded = format!("{}{}", token, "=".repeat((4 - token.len() % 4) % 4));
        assert_eq!(from_string(&padded).unwrap(), from_string(&token).unwrap());
    }

    #[test]
    fn test_old_32_layout() {
        // 263 bytes: no api_id, 32-bit user id
        let mut data = vec![2u8, 1u8];
        data.extend_from_slice(&[0x63; AUTH_KEY_SIZE]);
        data.extend_from_slice(&123456u32.to_be_bytes());
        data.push(0);
        assert_eq!(data.len(), 263);

        let decoded = from_string(&URL_SAFE_NO_PAD.encode(&data)).unwrap();
        assert_eq!(decoded.dc_id(), 2);
        assert!(decoded.test_mode());
        assert_eq!(decoded.user_id(), Some(123456));
        assert_eq!(decoded.api_id(), None);
        assert!(!decoded.is_bot());
    }

    #[test]
    fn test_old_64_layout() {
        let mut data = vec![5u8, 0u8];
        data.extend_from_slice(&[0xAA; AUTH_KEY_SIZE]);
        data.extend_from_slice(&9_876_543_210u64.to_be_bytes());
        data.push(1);
        assert_eq!(data.len(), 267);

        let decoded = from_string(&URL_SAFE_NO_PAD.encode(&data)).unwrap();
        assert_eq!(decoded.dc_id(), 5);
        assert_eq!(decoded.user_id(), Some(9_876_543_210));
        assert_eq!(decoded.api_id(), None);
        assert!(decoded.is_bot());
    }

    #[test]
    fn test_unknown_length_rejected() {
        let data = vec![0u8; 270];
        let err = from_string(&URL_SAFE_NO_PAD.encode(&data)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedStringLength { len: 270, .. }
        ));
    }

    #[test]
    fn test_garbage_base64_rejected() {
        assert!(from_string("not base64 at all!").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyro.session");

        to_file(&sample_record(), &path).unwrap();
        let decoded = from_file(&path).unwrap();

        assert_eq!(decoded.dc_id(), 2);
        assert_eq!(decoded.auth_key().as_bytes(), &[0x63; AUTH_KEY_SIZE]);
        assert_eq!(decoded.user_id(), Some(112233445));
        assert_eq!(decoded.api_id(), Some(12345));
    }

    #[test]
    fn test_file_stamps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyro.session");
        to_file(&sample_record(), &path).unwrap();

        let conn = rusqlite::Connection::open(&path).unwrap();
        let version: i64 = conn
            .query_row("SELECT number FROM version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_file_missing() {
        let err = from_file(Path::new("/nonexistent/pyro.session")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_extra_table_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyro.session");
        to_file(&sample_record(), &path).unwrap();

        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE intruder (x INTEGER);")
            .unwrap();
        drop(conn);

        assert!(matches!(
            from_file(&path).unwrap_err(),
            Error::InvalidSessionFile { .. }
        ));
    }

    #[test]
    fn test_foreign_schema_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.session");

        // A Telethon-shaped file must not be accepted by this codec.
        crate::telethon::to_file(
            &SessionRecord::new(2, AuthKey::from([1; AUTH_KEY_SIZE])),
            &path,
        )
        .unwrap();

        assert!(matches!(
            from_file(&path).unwrap_err(),
            Error::InvalidSessionFile { .. }
        ));
    }

    #[test]
    fn test_not_a_database_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.session");
        std::fs::write(&path, b"this is not a sqlite file").unwrap();

        assert!(matches!(
            from_file(&path).unwrap_err(),
            Error::InvalidSessionFile { .. }
        ));
    }
}
