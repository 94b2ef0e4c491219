//! Session manager
//!
//! Uniform construction and export regardless of which concrete codec is
//! involved. The manager owns the [`SessionRecord`], hands read-only views
//! to codecs, and holds the device-identity profile used when a session is
//! turned into a live client.
//!
//! Codec operations are pure file/string transforms; the only operation
//! allowed to perform network-backed work is [`SessionManager::get_user_id`]
//! (and [`SessionManager::validate`], which is the same call), and it does so
//! through the [`UserLookup`] collaborator handed in by the caller.

use std::path::Path;

use crate::api::ApiProfile;
use crate::formats::SessionFormat;
use crate::session::SessionRecord;
use crate::{pyrogram, telethon, Error, Result};

/// External collaborator resolving the identity behind a session
///
/// Implementations talk to the live network. `Ok(None)` means the lookup
/// worked but the session resolved to no identity; connection-class failures
/// are errors.
pub trait UserLookup {
    fn lookup_current_user(&self, record: &SessionRecord) -> Result<Option<i64>>;
}

/// Owns a session record and converts it between formats
#[derive(Debug)]
pub struct SessionManager {
    record: SessionRecord,
    api: ApiProfile,
    valid: Option<bool>,
}

impl SessionManager {
    /// Wrap a record with a device-identity profile
    ///
    /// A record decoded without a real api id inherits the profile's, so
    /// every export has one to write.
    pub fn new(record: SessionRecord, api: ApiProfile) -> Self {
        let record = match record.api_id() {
            Some(id) if id != 0 => record,
            _ => {
                let api_id = api.api_id();
                record.with_api_id(api_id)
            }
        };

        Self {
            record,
            api,
            valid: None,
        }
    }

    /// Replace the device-identity profile
    pub fn with_api(mut self, api: ApiProfile) -> Self {
        self.api = api;
        self
    }

    pub fn from_pyrogram_string(string: &str, api: ApiProfile) -> Result<Self> {
        Ok(Self::new(pyrogram::from_string(string)?, api))
    }

    pub fn from_pyrogram_file(path: &Path, api: ApiProfile) -> Result<Self> {
        Ok(Self::new(pyrogram::from_file(path)?, api))
    }

    pub fn from_telethon_string(string: &str, api: ApiProfile) -> Result<Self> {
        Ok(Self::new(telethon::from_string(string)?, api))
    }

    pub fn from_telethon_file(path: &Path, api: ApiProfile) -> Result<Self> {
        Ok(Self::new(telethon::from_file(path)?, api))
    }

    /// Load from a tdata folder with the desktop profile it implies
    #[cfg(feature = "tdata")]
    pub fn from_tdata_folder(path: &Path) -> Result<Self> {
        Ok(Self::new(
            crate::tdata::from_folder(path)?,
            ApiProfile::TELEGRAM_DESKTOP,
        ))
    }

    pub fn to_pyrogram_string(&self) -> String {
        pyrogram::to_string(&self.record)
    }

    pub fn to_pyrogram_file(&self, path: &Path) -> Result<()> {
        pyrogram::to_file(&self.record, path)
    }

    pub fn to_telethon_string(&self) -> Result<String> {
        telethon::to_string(&self.record)
    }

    pub fn to_telethon_file(&self, path: &Path) -> Result<()> {
        telethon::to_file(&self.record, path)
    }

    /// Export as a tdata folder, resolving the user id first
    ///
    /// The folder format cannot omit the user id, so this is the one export
    /// that may invoke the network collaborator before encoding.
    #[cfg(feature = "tdata")]
    pub fn to_tdata_folder(&mut self, path: &Path, lookup: &dyn UserLookup) -> Result<()> {
        if let Err(err) = self.get_user_id(lookup) {
            tracing::warn!("fetching user id during folder export failed: {err}");
            return Err(err);
        }
        crate::tdata::to_folder(&self.record, path, &self.api)
    }

    /// Return the session's user id, resolving it once if unknown
    ///
    /// A cached non-zero id is returned as-is. Otherwise exactly one lookup
    /// is attempted: a returned id is cached on the record, no identity is a
    /// validation error, and the unresolved state persists so the caller may
    /// retry by calling again.
    pub fn get_user_id(&mut self, lookup: &dyn UserLookup) -> Result<i64> {
        if let Some(id) = self.record.user_id() {
            // Zero is only the wire sentinel for "unknown", not an identity.
            if id != 0 {
                return Ok(id);
            }
        }

        tracing::debug!("resolving user id via network lookup");
        match lookup.lookup_current_user(&self.record)? {
            Some(id) => {
                self.record.fill_user_id(id);
                Ok(id)
            }
            None => Err(Error::NoIdentity),
        }
    }

    /// Check the session against the live network
    pub fn validate(&mut self, lookup: &dyn UserLookup) -> Result<bool> {
        let user = lookup.lookup_current_user(&self.record)?;
        if let Some(id) = user {
            self.record.fill_user_id(id);
        }

        self.valid = Some(user.is_some());
        Ok(user.is_some())
    }

    /// Load a session through the format registry
    ///
    /// `source` is the session string for string formats and a path for
    /// file/folder formats. Dispatching to a format not compiled into this
    /// build fails fast with [`Error::UnsupportedFormat`].
    pub fn from_source(format: SessionFormat, source: &str, api: ApiProfile) -> Result<Self> {
        match format {
            SessionFormat::PyrogramString => Self::from_pyrogram_string(source, api),
            SessionFormat::PyrogramFile => Self::from_pyrogram_file(Path::new(source), api),
            SessionFormat::TelethonString => Self::from_telethon_string(source, api),
            SessionFormat::TelethonFile => Self::from_telethon_file(Path::new(source), api),
            #[cfg(feature = "tdata")]
            SessionFormat::TdataFolder => Ok(Self::new(
                crate::tdata::from_folder(Path::new(source))?,
                api,
            )),
            #[cfg(not(feature = "tdata"))]
            SessionFormat::TdataFolder => Err(Error::UnsupportedFormat { format }),
        }
    }

    /// Export through the format registry
    ///
    /// String formats return the session string; file/folder formats write
    /// to `target` and return `None`.
    pub fn export(
        &mut self,
        format: SessionFormat,
        target: Option<&Path>,
        lookup: &dyn UserLookup,
    ) -> Result<Option<String>> {
        match format {
            SessionFormat::PyrogramString => Ok(Some(self.to_pyrogram_string())),
            SessionFormat::TelethonString => Ok(Some(self.to_telethon_string()?)),
            SessionFormat::PyrogramFile => {
                self.to_pyrogram_file(Self::required_target(format, target)?)?;
                Ok(None)
            }
            SessionFormat::TelethonFile => {
                self.to_telethon_file(Self::required_target(format, target)?)?;
                Ok(None)
            }
            #[cfg(feature = "tdata")]
            SessionFormat::TdataFolder => {
                self.to_tdata_folder(Self::required_target(format, target)?, lookup)?;
                Ok(None)
            }
            #[cfg(not(feature = "tdata"))]
            SessionFormat::TdataFolder => {
                let _ = lookup;
                Err(Error::UnsupportedFormat { format })
            }
        }
    }

    fn required_target(format: SessionFormat, target: Option<&Path>) -> Result<&Path> {
        target.ok_or_else(|| {
            Error::invalid_format(format!("output path required for {format}"))
        })
    }

    /// Read-only view of the owned record
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// The device-identity profile
    pub fn api(&self) -> &ApiProfile {
        &self.api
    }

    /// Result of the last [`SessionManager::validate`] call, if any
    pub fn is_valid(&self) -> Option<bool> {
        self.valid
    }

    /// Hexadecimal rendering of the auth key
    pub fn auth_key_hex(&self) -> String {
        self.record.auth_key().to_hex()
    }
}
