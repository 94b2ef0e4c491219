//! Error types for tgconv

use std::path::PathBuf;

use crate::formats::SessionFormat;

/// Result type alias for tgconv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, converting or encoding sessions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error while reading or writing session files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error while reading or writing a session database
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A session file path does not exist
    #[error("session file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A tdata folder path does not exist
    #[error("tdata folder not found: {path}")]
    FolderNotFound { path: PathBuf },

    /// Required file is missing from a tdata folder
    #[error("required file not found: {file} in {folder}")]
    TdataFileNotFound { file: String, folder: PathBuf },

    /// The file exists but its table/column sets do not match the format's schema
    #[error("not a valid session file: {path}")]
    InvalidSessionFile { path: PathBuf },

    /// Decoded session string length matches no known layout
    #[error("decoded session string has unexpected length: {len} (expected {expected})")]
    UnexpectedStringLength { len: usize, expected: &'static str },

    /// Auth key material has the wrong length
    #[error("auth key must be {expected} bytes, got {len}")]
    InvalidAuthKey { len: usize, expected: usize },

    /// No default endpoint is known for this data center
    #[error("unknown data center: dc_id={dc_id}, test_mode={test_mode}")]
    UnknownDc { dc_id: i32, test_mode: bool },

    /// The target format cannot be produced without a known user id
    #[error("user id is required to export a tdata folder")]
    UserIdRequired,

    /// The format is not compiled into this build
    #[error("session format not supported in this build: {format}")]
    UnsupportedFormat { format: SessionFormat },

    /// The user lookup collaborator failed to reach the network
    #[error("user lookup failed: {message}")]
    Lookup { message: String },

    /// The user lookup succeeded but returned no identity
    #[error("session did not resolve to a user")]
    NoIdentity,

    /// Failed to decrypt tdata - corrupted data or wrong key material
    #[error("decryption failed: corrupted data or wrong key material")]
    DecryptionFailed,

    /// MD5/SHA1 checksum mismatch in tdata
    #[error("checksum mismatch: data may be corrupted")]
    ChecksumMismatch,

    /// Unexpected end of data while parsing a binary stream
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEof { offset: u64 },

    /// Invalid data format or structure
    #[error("invalid data format: {message}")]
    InvalidFormat { message: String },

    /// No accounts found in a tdata folder
    #[error("no accounts found in tdata")]
    NoAccounts,
}

impl Error {
    /// Create an invalid format error with a message
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: msg.into(),
        }
    }

    /// Create a lookup error with a message
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup {
            message: msg.into(),
        }
    }
}
