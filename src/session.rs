//! The common in-memory session representation
//!
//! Every codec decodes into a [`SessionRecord`] and encodes from one. The
//! record is independent of any wire or file layout; codecs that cannot
//! supply a field leave it unset rather than fabricating a value.

use std::net::IpAddr;

use crate::{Error, Result, AUTH_KEY_SIZE};

/// Long-term authorization key (256 bytes)
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey {
    data: [u8; AUTH_KEY_SIZE],
}

impl AuthKey {
    /// Create an AuthKey from raw bytes
    ///
    /// Fails unless the slice is exactly 256 bytes; keys are never truncated
    /// or padded.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != AUTH_KEY_SIZE {
            return Err(Error::InvalidAuthKey {
                len: bytes.len(),
                expected: AUTH_KEY_SIZE,
            });
        }

        let mut data = [0u8; AUTH_KEY_SIZE];
        data.copy_from_slice(bytes);
        Ok(Self { data })
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; AUTH_KEY_SIZE] {
        &self.data
    }

    /// Hexadecimal rendering of the key
    pub fn to_hex(&self) -> String {
        hex::encode(self.data)
    }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key material in debug output
        f.debug_struct("AuthKey")
            .field("len", &self.data.len())
            .finish()
    }
}

impl From<[u8; AUTH_KEY_SIZE]> for AuthKey {
    fn from(data: [u8; AUTH_KEY_SIZE]) -> Self {
        Self { data }
    }
}

/// A session, independent of any on-disk format
///
/// `dc_id` and the auth key are fixed at construction; the optional fields
/// are set via the `with_*` builders. The only post-construction mutation is
/// [`SessionRecord::fill_user_id`], a one-way enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    dc_id: i32,
    auth_key: AuthKey,
    user_id: Option<i64>,
    is_bot: bool,
    test_mode: bool,
    api_id: Option<i32>,
    phone_number: Option<String>,
    server_address: Option<IpAddr>,
    port: Option<u16>,
    takeout_id: Option<i64>,
}

impl SessionRecord {
    /// Create a record bound to a data center with the given auth key
    pub fn new(dc_id: i32, auth_key: AuthKey) -> Self {
        Self {
            dc_id,
            auth_key,
            user_id: None,
            is_bot: false,
            test_mode: false,
            api_id: None,
            phone_number: None,
            server_address: None,
            port: None,
            takeout_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<Option<i64>>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_bot(mut self, is_bot: bool) -> Self {
        self.is_bot = is_bot;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_api_id(mut self, api_id: impl Into<Option<i32>>) -> Self {
        self.api_id = api_id.into();
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<Option<String>>) -> Self {
        self.phone_number = phone_number.into();
        self
    }

    pub fn with_endpoint(mut self, address: impl Into<Option<IpAddr>>, port: impl Into<Option<u16>>) -> Self {
        self.server_address = address.into();
        self.port = port.into();
        self
    }

    pub fn with_takeout_id(mut self, takeout_id: impl Into<Option<i64>>) -> Self {
        self.takeout_id = takeout_id.into();
        self
    }

    /// Get the data center ID
    pub fn dc_id(&self) -> i32 {
        self.dc_id
    }

    /// Get the auth key
    pub fn auth_key(&self) -> &AuthKey {
        &self.auth_key
    }

    /// Get the user ID, if the source format carried one
    ///
    /// Some wire formats only have a zero sentinel for "unknown"; a decoded
    /// zero is preserved here as `Some(0)` and treated as unknown by
    /// [`crate::SessionManager::get_user_id`].
    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// Whether the account is a bot
    pub fn is_bot(&self) -> bool {
        self.is_bot
    }

    /// Whether the auth key belongs to the test server cluster
    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// Get the API ID under which the key was issued, if known
    pub fn api_id(&self) -> Option<i32> {
        self.api_id
    }

    /// Get the phone number, if known
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Explicit server address overriding the per-DC default, if any
    pub fn server_address(&self) -> Option<IpAddr> {
        self.server_address
    }

    /// Explicit server port overriding the per-DC default, if any
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Takeout session marker (Telethon file format only)
    pub fn takeout_id(&self) -> Option<i64> {
        self.takeout_id
    }

    /// Whether a real (non-zero) user id is known
    pub fn has_user_id(&self) -> bool {
        matches!(self.user_id, Some(id) if id != 0)
    }

    /// One-way user id enrichment
    ///
    /// Sets the user id if it is unset or still the zero sentinel; a real id,
    /// once known, is never overwritten.
    pub fn fill_user_id(&mut self, user_id: i64) {
        if !self.has_user_id() {
            self.user_id = Some(user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_key_from_bytes() {
        let bytes = [0xAB; AUTH_KEY_SIZE];
        let key = AuthKey::from_bytes(&bytes).unwrap();
        assert_eq!(key.as_bytes(), &bytes);
    }

    #[test]
    fn test_auth_key_wrong_size() {
        let bytes = [0u8; 100];
        assert!(matches!(
            AuthKey::from_bytes(&bytes),
            Err(Error::InvalidAuthKey { len: 100, .. })
        ));
    }

    #[test]
    fn test_auth_key_debug_redacted() {
        let key = AuthKey::from_bytes(&[0xAB; AUTH_KEY_SIZE]).unwrap();
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("ab, ab"));
        assert!(rendered.contains("len"));
    }

    #[test]
    fn test_record_defaults() {
        let record = SessionRecord::new(2, AuthKey::from([7u8; AUTH_KEY_SIZE]));
        assert_eq!(record.dc_id(), 2);
        assert_eq!(record.user_id(), None);
        assert!(!record.is_bot());
        assert!(!record.test_mode());
        assert_eq!(record.api_id(), None);
        assert_eq!(record.phone_number(), None);
        assert_eq!(record.server_address(), None);
        assert_eq!(record.takeout_id(), None);
    }

    #[test]
    fn test_fill_user_id_is_one_way() {
        let mut record = SessionRecord::new(2, AuthKey::from([7u8; AUTH_KEY_SIZE]));
        assert!(!record.has_user_id());

        record.fill_user_id(42);
        assert_eq!(record.user_id(), Some(42));

        record.fill_user_id(99);
        assert_eq!(record.user_id(), Some(42));
    }

    #[test]
    fn test_fill_user_id_replaces_zero_sentinel() {
        let mut record =
            SessionRecord::new(2, AuthKey::from([7u8; AUTH_KEY_SIZE])).with_user_id(0);
        assert!(!record.has_user_id());

        record.fill_user_id(42);
        assert_eq!(record.user_id(), Some(42));
    }
}
