//! Device-identity profiles
//!
//! An [`ApiProfile`] bundles the application identity (api id/hash) with the
//! device strings a live client would advertise. Profiles are immutable
//! values; converting a session never mutates the profile it was given.

use std::borrow::Cow;

/// Application + device identity used when a session is turned into a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiProfile {
    api_id: i32,
    api_hash: Cow<'static, str>,
    device_model: Cow<'static, str>,
    system_version: Cow<'static, str>,
    app_version: Cow<'static, str>,
    lang_code: Cow<'static, str>,
    system_lang_code: Cow<'static, str>,
}

impl ApiProfile {
    /// Telegram Desktop
    pub const TELEGRAM_DESKTOP: ApiProfile = ApiProfile {
        api_id: 17349,
        api_hash: Cow::Borrowed("344583e45741c457fe1862106095a5eb"),
        device_model: Cow::Borrowed("Desktop"),
        system_version: Cow::Borrowed("Windows 10"),
        app_version: Cow::Borrowed("4.8.0"),
        lang_code: Cow::Borrowed("en"),
        system_lang_code: Cow::Borrowed("en-US"),
    };

    /// Telegram Android
    pub const TELEGRAM_ANDROID: ApiProfile = ApiProfile {
        api_id: 4,
        api_hash: Cow::Borrowed("014b35b6184100b085b0d0572f9b5103"),
        device_model: Cow::Borrowed("Android"),
        system_version: Cow::Borrowed("SDK 23"),
        app_version: Cow::Borrowed("9.7.0"),
        lang_code: Cow::Borrowed("en"),
        system_lang_code: Cow::Borrowed("en-US"),
    };

    /// Telegram iOS
    pub const TELEGRAM_IOS: ApiProfile = ApiProfile {
        api_id: 8,
        api_hash: Cow::Borrowed("7245de8e747a0d6fbe11f7cc14fcc0bb"),
        device_model: Cow::Borrowed("iPhone"),
        system_version: Cow::Borrowed("iOS 15.0"),
        app_version: Cow::Borrowed("9.7.0"),
        lang_code: Cow::Borrowed("en"),
        system_lang_code: Cow::Borrowed("en-US"),
    };

    /// Telegram macOS
    pub const TELEGRAM_MACOS: ApiProfile = ApiProfile {
        api_id: 946,
        api_hash: Cow::Borrowed("5f3fb04eac560c6a3d7dd5cacb85e8b0"),
        device_model: Cow::Borrowed("Mac"),
        system_version: Cow::Borrowed("macOS 12.0"),
        app_version: Cow::Borrowed("9.7.0"),
        lang_code: Cow::Borrowed("en"),
        system_lang_code: Cow::Borrowed("en-US"),
    };

    /// A custom application identity with the desktop device strings
    pub fn custom(api_id: i32, api_hash: impl Into<String>) -> Self {
        Self {
            api_id,
            api_hash: Cow::Owned(api_hash.into()),
            ..Self::TELEGRAM_DESKTOP
        }
    }

    pub fn api_id(&self) -> i32 {
        self.api_id
    }

    pub fn api_hash(&self) -> &str {
        &self.api_hash
    }

    pub fn device_model(&self) -> &str {
        &self.device_model
    }

    pub fn system_version(&self) -> &str {
        &self.system_version
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn lang_code(&self) -> &str {
        &self.lang_code
    }

    pub fn system_lang_code(&self) -> &str {
        &self.system_lang_code
    }
}

impl Default for ApiProfile {
    fn default() -> Self {
        Self::TELEGRAM_DESKTOP
    }
}
