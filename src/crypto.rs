//! Local-storage cryptography for tdata
//!
//! Implements the scheme Telegram Desktop protects its local files with:
//! PBKDF2-SHA512 key derivation, AES-256-IGE with the old MTProto 1.0 key
//! schedule, SHA1 message keys.

use rand::RngCore;
use sha1::{Digest as Sha1Digest, Sha1};
use sha2::Sha512;

use crate::session::AuthKey;
use crate::{Error, Result, AUTH_KEY_SIZE};

/// Size of the local encryption salt
pub const LOCAL_ENCRYPT_SALT_SIZE: usize = 32;

/// AES-256 key size
const AES_KEY_SIZE: usize = 32;

/// AES block size
const AES_BLOCK_SIZE: usize = 16;

/// PBKDF2 iteration count used by Telegram Desktop (with passcode)
const PBKDF2_ITERATIONS_WITH_PASSCODE: u32 = 100_000;

/// PBKDF2 iteration count used by Telegram Desktop (without passcode)
const PBKDF2_ITERATIONS_NO_PASSCODE: u32 = 1;

/// Create a local encryption key from salt and passcode using PBKDF2-SHA512
///
/// 1. hash_key = SHA512(salt + passcode + salt)
/// 2. iterations = 1 if no passcode, else 100000
/// 3. key = PBKDF2-HMAC-SHA512(hash_key, salt, iterations)
pub fn create_local_key(salt: &[u8], passcode: &[u8]) -> AuthKey {
    let mut key_data = [0u8; AUTH_KEY_SIZE];

    let mut hasher = Sha512::new();
    hasher.update(salt);
    hasher.update(passcode);
    hasher.update(salt);
    let hash_key = hasher.finalize();

    let iterations = if passcode.is_empty() {
        PBKDF2_ITERATIONS_NO_PASSCODE
    } else {
        PBKDF2_ITERATIONS_WITH_PASSCODE
    };

    pbkdf2::pbkdf2_hmac::<Sha512>(&hash_key, salt, iterations, &mut key_data);

    AuthKey::from(key_data)
}

/// Generate a fresh random local key for a new tdata folder
pub fn generate_local_key() -> AuthKey {
    let mut key_data = [0u8; AUTH_KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key_data);
    AuthKey::from(key_data)
}

/// Generate a fresh random salt
pub fn generate_salt() -> [u8; LOCAL_ENCRYPT_SALT_SIZE] {
    let mut salt = [0u8; LOCAL_ENCRYPT_SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Decrypt a local-storage blob
///
/// Layout:
/// - bytes[0..16]: message key (SHA1 prefix of the plaintext)
/// - bytes[16..]: AES-256-IGE ciphertext
///
/// Plaintext layout:
/// - bytes[0..4]: original data length (little endian)
/// - bytes[4..len]: actual data
/// - bytes[len..]: padding
pub fn decrypt_local(encrypted: &[u8], key: &AuthKey) -> Result<Vec<u8>> {
    if encrypted.len() <= AES_BLOCK_SIZE {
        return Err(Error::invalid_format("encrypted data too short"));
    }

    if encrypted.len() % AES_BLOCK_SIZE != 0 {
        return Err(Error::invalid_format(
            "encrypted data length must be multiple of 16",
        ));
    }

    let message_key = &encrypted[0..16];
    let ciphertext = &encrypted[16..];

    let (aes_key, aes_iv) = prepare_aes_oldmtp(key.as_bytes(), message_key);
    let mut decrypted = ciphertext.to_vec();
    grammers_crypto::aes::ige_decrypt(&mut decrypted, &aes_key, &aes_iv);

    // The message key doubles as the integrity check.
    let check_hash = &sha1_hash(&decrypted)[0..16];
    if check_hash != message_key {
        tracing::debug!(
            "local blob SHA1 mismatch: expected={:02x?}, computed={:02x?}",
            message_key,
            check_hash
        );
        return Err(Error::ChecksumMismatch);
    }

    if decrypted.len() < 4 {
        return Err(Error::DecryptionFailed);
    }

    let original_len =
        u32::from_le_bytes([decrypted[0], decrypted[1], decrypted[2], decrypted[3]]) as usize;

    let full_len = ciphertext.len();
    if original_len > decrypted.len()
        || original_len <= full_len.saturating_sub(16)
        || original_len < 4
    {
        return Err(Error::invalid_format(format!(
            "invalid decrypted length: {}, ciphertext: {}, plaintext: {}",
            original_len,
            full_len,
            decrypted.len()
        )));
    }

    Ok(decrypted[4..original_len].to_vec())
}

/// Encrypt a local-storage blob (inverse of [`decrypt_local`])
///
/// Prepends the little-endian length, pads to the AES block size with random
/// bytes, and prefixes the SHA1-derived message key.
pub fn encrypt_local(data: &[u8], key: &AuthKey) -> Vec<u8> {
    let size = 4 + data.len();
    let full_size = if size % AES_BLOCK_SIZE == 0 {
        size
    } else {
        size + AES_BLOCK_SIZE - size % AES_BLOCK_SIZE
    };

    let mut plaintext = Vec::with_capacity(full_size);
    plaintext.extend_from_slice(&(size as u32).to_le_bytes());
    plaintext.extend_from_slice(data);

    let mut padding = vec![0u8; full_size - size];
    rand::thread_rng().fill_bytes(&mut padding);
    plaintext.extend_from_slice(&padding);

    let mut message_key = [0u8; 16];
    message_key.copy_from_slice(&sha1_hash(&plaintext)[0..16]);

    let (aes_key, aes_iv) = prepare_aes_oldmtp(key.as_bytes(), &message_key);
    let mut ciphertext = plaintext.clone();
    grammers_crypto::aes::ige_encrypt(&mut ciphertext, &aes_key, &aes_iv);

    let mut out = Vec::with_capacity(16 + ciphertext.len());
    out.extend_from_slice(&message_key);
    out.extend_from_slice(&ciphertext);
    out
}

/// Derive the AES key and IV from a local key and message key
///
/// Old MTProto 1.0 schedule; local storage always uses the receive-side
/// offset (x = 8), in both directions.
fn prepare_aes_oldmtp(local_key: &[u8], msg_key: &[u8]) -> ([u8; AES_KEY_SIZE], [u8; AES_KEY_SIZE]) {
    let x: usize = 8;

    // sha1_a = SHA1(msgKey + key[x..x+32])
    let sha1_a = sha1_hash_2(msg_key, &local_key[x..x + 32]);

    // sha1_b = SHA1(key[32+x..48+x] + msgKey + key[48+x..64+x])
    let sha1_b = sha1_hash_3(
        &local_key[32 + x..48 + x],
        msg_key,
        &local_key[48 + x..64 + x],
    );

    // sha1_c = SHA1(key[64+x..96+x] + msgKey)
    let sha1_c = sha1_hash_2(&local_key[64 + x..96 + x], msg_key);

    // sha1_d = SHA1(msgKey + key[96+x..128+x])
    let sha1_d = sha1_hash_2(msg_key, &local_key[96 + x..128 + x]);

    let mut key = [0u8; AES_KEY_SIZE];
    let mut iv = [0u8; AES_KEY_SIZE];

    // aes_key = sha1_a[0..8] + sha1_b[8..20] + sha1_c[4..16]
    key[0..8].copy_from_slice(&sha1_a[0..8]);
    key[8..20].copy_from_slice(&sha1_b[8..20]);
    key[20..32].copy_from_slice(&sha1_c[4..16]);

    // aes_iv = sha1_a[8..20] + sha1_b[0..8] + sha1_c[16..20] + sha1_d[0..8]
    iv[0..12].copy_from_slice(&sha1_a[8..20]);
    iv[12..20].copy_from_slice(&sha1_b[0..8]);
    iv[20..24].copy_from_slice(&sha1_c[16..20]);
    iv[24..32].copy_from_slice(&sha1_d[0..8]);

    (key, iv)
}

/// Compute SHA-1 hash
fn sha1_hash(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn sha1_hash_2(a: &[u8], b: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

fn sha1_hash_3(a: &[u8], b: &[u8], c: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(a);
    hasher.update(b);
    hasher.update(c);
    hasher.finalize().into()
}
