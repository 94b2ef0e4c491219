//! Session format registry
//!
//! Each codec is addressed by a [`SessionFormat`] value. Availability is a
//! build-time capability: the tdata codec only exists when the `tdata`
//! feature is compiled in, and dispatching to an absent codec fails fast
//! with [`crate::Error::UnsupportedFormat`] instead of surfacing a missing
//! symbol somewhere deeper.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Identifies one concrete session representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionFormat {
    /// Pyrogram base64 session string
    PyrogramString,
    /// Pyrogram SQLite session file
    PyrogramFile,
    /// Telethon base64 session string
    TelethonString,
    /// Telethon SQLite session file
    TelethonFile,
    /// Telegram Desktop tdata folder
    TdataFolder,
}

impl SessionFormat {
    /// All formats this crate knows about, available or not
    pub const ALL: [SessionFormat; 5] = [
        SessionFormat::PyrogramString,
        SessionFormat::PyrogramFile,
        SessionFormat::TelethonString,
        SessionFormat::TelethonFile,
        SessionFormat::TdataFolder,
    ];

    /// Whether the codec for this format is compiled into the build
    pub fn is_available(self) -> bool {
        match self {
            SessionFormat::TdataFolder => cfg!(feature = "tdata"),
            _ => true,
        }
    }

    /// Whether the format is a string rather than a file/folder on disk
    pub fn is_string(self) -> bool {
        matches!(
            self,
            SessionFormat::PyrogramString | SessionFormat::TelethonString
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionFormat::PyrogramString => "pyro-string",
            SessionFormat::PyrogramFile => "pyro-file",
            SessionFormat::TelethonString => "tele-string",
            SessionFormat::TelethonFile => "tele-file",
            SessionFormat::TdataFolder => "tdata-folder",
        }
    }
}

impl fmt::Display for SessionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        SessionFormat::ALL
            .iter()
            .find(|format| format.as_str() == s)
            .copied()
            .ok_or_else(|| Error::invalid_format(format!("unknown session format: {s}")))
    }
}
