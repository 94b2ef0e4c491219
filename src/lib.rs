//! # tgconv
//!
//! Convert Telegram authentication sessions between the at-rest formats used
//! by different client families:
//!
//! - Pyrogram session strings and `.session` SQLite files
//! - Telethon session strings and `.session` SQLite files
//! - Telegram Desktop `tdata` folders (behind the `tdata` feature)
//!
//! Every format carries the same logical facts (data center, 256-byte auth
//! key, and some auxiliary identifiers); this crate parses each of them into
//! a common [`SessionRecord`] and re-serializes that record into any target
//! format, degrading gracefully where a target cannot represent a field.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tgconv::{ApiProfile, SessionManager};
//!
//! fn main() -> Result<(), tgconv::Error> {
//!     let manager = SessionManager::from_pyrogram_string(
//!         "BAgAAVR...",
//!         ApiProfile::TELEGRAM_DESKTOP,
//!     )?;
//!
//!     println!("DC ID: {}", manager.record().dc_id());
//!     println!("Telethon session: {}", manager.to_telethon_string()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! The only operation that performs network-backed work is
//! [`SessionManager::get_user_id`], and it does so through the caller-provided
//! [`UserLookup`] collaborator; every codec is a pure, synchronous transform.

mod api;
mod db;
mod dc;
mod error;
mod formats;
mod manager;
mod session;

pub mod pyrogram;
pub mod telethon;

#[cfg(feature = "tdata")]
mod crypto;
#[cfg(feature = "tdata")]
mod qstream;
#[cfg(feature = "tdata")]
mod storage;
#[cfg(feature = "tdata")]
pub mod tdata;

pub use api::ApiProfile;
pub use dc::default_endpoint;
pub use error::{Error, Result};
pub use formats::SessionFormat;
pub use manager::{SessionManager, UserLookup};
pub use session::{AuthKey, SessionRecord};

/// Auth key size in bytes (256 bytes = 2048 bits)
pub const AUTH_KEY_SIZE: usize = 256;
