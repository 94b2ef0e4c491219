//! Telethon session codec
//!
//! The string form is version-prefixed: one version character followed by
//! URL-safe base64 over `dc_id(1) + ip(4|16) + port(2) + auth_key(256)`,
//! big-endian. The IP width is not tagged; it falls out of the decoded byte
//! length. The file form is a SQLite database whose schema other Telethon
//! implementations read directly.
//!
//! Neither form stores a user id in its core layout; the file format may
//! yield one best-effort from its entity cache.

use std::io::{Cursor, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use byteorder::{BigEndian, ReadBytesExt};
use rusqlite::{params, OptionalExtension};

use crate::db::{self, TableSpec};
use crate::dc;
use crate::session::{AuthKey, SessionRecord};
use crate::{Error, Result, AUTH_KEY_SIZE};

/// Version character prefixed to every emitted string
const CURRENT_VERSION: char = '1';

/// Decoded payload length with a 4-byte IPv4 address
const DECODED_LEN_V4: usize = 1 + 4 + 2 + AUTH_KEY_SIZE;
/// Decoded payload length with a 16-byte IPv6 address
const DECODED_LEN_V6: usize = 1 + 16 + 2 + AUTH_KEY_SIZE;

/// Decode a Telethon session string
pub fn from_string(token: &str) -> Result<SessionRecord> {
    // The leading version character is not part of the payload.
    let mut chars = token.chars();
    if chars.next().is_none() {
        return Err(Error::invalid_format("empty session string"));
    }
    let payload = chars.as_str();

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| Error::invalid_format("session string is not valid base64"))?;

    let ip_len = match decoded.len() {
        DECODED_LEN_V4 => 4,
        DECODED_LEN_V6 => 16,
        len => {
            return Err(Error::UnexpectedStringLength {
                len,
                expected: "263 or 275",
            })
        }
    };

    let mut cursor = Cursor::new(decoded.as_slice());
    let dc_id = cursor.read_u8()? as i32;

    let address: IpAddr = if ip_len == 4 {
        let mut octets = [0u8; 4];
        cursor.read_exact(&mut octets)?;
        Ipv4Addr::from(octets).into()
    } else {
        let mut octets = [0u8; 16];
        cursor.read_exact(&mut octets)?;
        Ipv6Addr::from(octets).into()
    };

    let port = cursor.read_u16::<BigEndian>()?;
    let mut key = [0u8; AUTH_KEY_SIZE];
    cursor.read_exact(&mut key)?;

    Ok(SessionRecord::new(dc_id, AuthKey::from(key)).with_endpoint(address, port))
}

/// Encode a record as a Telethon session string
///
/// A record without an explicit endpoint gets the static default for its
/// `(dc_id, test_mode)` pair baked in.
pub fn to_string(record: &SessionRecord) -> Result<String> {
    let (address, port) = resolve_endpoint(record)?;

    let ip_bytes: Vec<u8> = match address {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    };

    let mut data = Vec::with_capacity(1 + ip_bytes.len() + 2 + AUTH_KEY_SIZE);
    data.push(record.dc_id() as u8);
    data.extend_from_slice(&ip_bytes);
    data.extend_from_slice(&port.to_be_bytes());
    data.extend_from_slice(record.auth_key().as_bytes());

    // Telethon emits padded base64 after the version character.
    Ok(format!("{}{}", CURRENT_VERSION, URL_SAFE.encode(data)))
}

fn resolve_endpoint(record: &SessionRecord) -> Result<(IpAddr, u16)> {
    match (record.server_address(), record.port()) {
        (Some(address), Some(port)) => Ok((address, port)),
        (address, port) => {
            let (default_address, default_port) =
                dc::default_endpoint(record.dc_id(), record.test_mode())?;
            let address = match address {
                Some(address) => address,
                None => default_address
                    .parse()
                    .map_err(|_| Error::invalid_format("malformed default endpoint address"))?,
            };
            Ok((address, port.unwrap_or(default_port)))
        }
    }
}

const SCHEMA: &str = r#"
CREATE TABLE version (version integer primary key);

CREATE TABLE sessions (
    dc_id integer primary key,
    server_address text,
    port integer,
    auth_key blob,
    takeout_id integer
);

CREATE TABLE entities (
    id integer primary key,
    hash integer not null,
    username text,
    phone integer,
    name text,
    date integer
);

CREATE TABLE sent_files (
    md5_digest blob,
    file_size integer,
    type integer,
    id integer,
    hash integer,
    primary key(md5_digest, file_size, type)
);

CREATE TABLE update_state (
    id integer primary key,
    pts integer,
    qts integer,
    date integer,
    seq integer
);
"#;

/// Schema version stamped into new files (Telethon v1.x storage)
const SCHEMA_VERSION: i64 = 7;

/// Table and column sets other Telethon implementations expect verbatim
const TABLES: &[TableSpec] = &[
    (
        "sessions",
        &["dc_id", "server_address", "port", "auth_key", "takeout_id"],
    ),
    ("entities", &["id", "hash", "username", "phone", "name", "date"]),
    ("sent_files", &["md5_digest", "file_size", "type", "id", "hash"]),
    ("update_state", &["id", "pts", "qts", "date", "seq"]),
    ("version", &["version"]),
];

/// Read a Telethon SQLite session file
///
/// The core row never stores a user id; the first real entity row, when the
/// live client has cached one, supplies user id and phone number
/// best-effort. Their absence is not an error.
pub fn from_file(path: &Path) -> Result<SessionRecord> {
    let conn = db::open_validated(path, TABLES)?;

    let row = conn
        .query_row(
            "SELECT dc_id, server_address, port, auth_key, takeout_id FROM sessions",
            [],
            |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<u16>>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            },
        )
        .optional()?;

    let (dc_id, address_text, port, key, takeout_id) =
        row.ok_or_else(|| Error::InvalidSessionFile {
            path: path.to_path_buf(),
        })?;

    let address: Option<IpAddr> = match address_text {
        Some(text) => Some(
            text.parse()
                .map_err(|_| Error::invalid_format("malformed server address in session file"))?,
        ),
        None => None,
    };

    let entity = conn
        .query_row(
            "SELECT id, phone FROM entities WHERE id != 0 LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                ))
            },
        )
        .optional()?;
    let (user_id, phone) = entity.unwrap_or((None, None));

    Ok(SessionRecord::new(dc_id, AuthKey::from_bytes(&key)?)
        .with_endpoint(address, port)
        .with_takeout_id(takeout_id)
        .with_user_id(user_id)
        .with_phone_number(phone.map(|p| p.to_string())))
}

/// Write a Telethon SQLite session file
///
/// Creates the schema fresh and inserts a single sessions row. Only the
/// fields this format's core table defines are populated; the auxiliary
/// tables stay empty, as a live client would fill them.
pub fn to_file(record: &SessionRecord, path: &Path) -> Result<()> {
    let (address, port) = resolve_endpoint(record)?;

    let conn = db::create(path)?;
    conn.execute_batch(SCHEMA)?;

    conn.execute("INSERT INTO version (version) VALUES (?1)", [SCHEMA_VERSION])?;
    conn.execute(
        "INSERT INTO sessions VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.dc_id(),
            address.to_string(),
            port,
            record.auth_key().as_bytes().as_slice(),
            record.takeout_id(),
        ],
    )?;

    tracing::debug!("wrote telethon session file: {:?}", path);
    Ok(())
}
