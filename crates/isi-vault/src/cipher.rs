// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ansible Vault 1.1 envelope encryption.
//!
//! Layout of an encrypted file:
//!
//! ```text
//! $ANSIBLE_VAULT;1.1;AES256
//! <hex( hex(salt) "\n" hex(hmac) "\n" hex(ciphertext) ), wrapped at 80 columns>
//! ```
//!
//! PBKDF2-HMAC-SHA256 (10 000 rounds, 32-byte salt) stretches the password into
//! 80 bytes: AES-256 key, HMAC-SHA256 key, 16-byte initial counter. The
//! plaintext is PKCS#7 padded and encrypted with AES-256-CTR; the HMAC covers
//! the ciphertext. Files written here open with `ansible-vault view` and vice
//! versa.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use isi_common_secret::SecretString;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Leading bytes that mark a file as encrypted.
pub const VAULT_MARKER: &[u8] = b"$ANSIBLE_VAULT";

const HEADER: &str = "$ANSIBLE_VAULT;1.1;AES256";
const CIPHER_NAME: &str = "AES256";
const SALT_SIZE: usize = 32;
const KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;
const BLOCK_SIZE: usize = 16;
const KDF_ROUNDS: u32 = 10_000;
const LINE_WIDTH: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
	#[error("vault header is malformed")]
	MalformedHeader,

	#[error("unsupported vault format {version} with cipher {cipher}")]
	Unsupported { version: String, cipher: String },

	#[error("vault body is not valid hex")]
	InvalidHex,

	#[error("vault body is malformed: {0}")]
	MalformedBody(&'static str),

	#[error("HMAC mismatch: wrong password or corrupted vault")]
	IntegrityCheckFailed,

	#[error("decrypted vault has invalid padding")]
	InvalidPadding,

	#[error("derived key has invalid length")]
	InvalidKeyLength,
}

/// Raw vault file bytes, tagged by whether they need decrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultPayload<'a> {
	Plaintext(&'a [u8]),
	Encrypted(&'a [u8]),
}

/// Decide how the bytes of a vault file must be read.
pub fn classify_payload(bytes: &[u8]) -> VaultPayload<'_> {
	if bytes.starts_with(VAULT_MARKER) {
		VaultPayload::Encrypted(bytes)
	} else {
		VaultPayload::Plaintext(bytes)
	}
}

/// Encrypt `plaintext` into a complete vault file body with a fresh salt.
pub fn encrypt(plaintext: &[u8], password: &SecretString) -> Result<Vec<u8>, CipherError> {
	let mut salt = [0u8; SALT_SIZE];
	rand::rngs::OsRng.fill_bytes(&mut salt);
	encrypt_with_salt(plaintext, password.expose().as_bytes(), &salt)
}

/// Decrypt a vault file body produced by [`encrypt`] or `ansible-vault`.
pub fn decrypt(data: &[u8], password: &SecretString) -> Result<Zeroizing<Vec<u8>>, CipherError> {
	let body = parse_envelope(data)?;
	let inner = hex::decode(body).map_err(|_| CipherError::InvalidHex)?;

	let mut parts = inner.splitn(3, |b| *b == b'\n');
	let salt_hex = parts.next().ok_or(CipherError::MalformedBody("missing salt"))?;
	let mac_hex = parts.next().ok_or(CipherError::MalformedBody("missing hmac"))?;
	let ciphertext_hex = parts
		.next()
		.ok_or(CipherError::MalformedBody("missing ciphertext"))?;

	let salt = hex::decode(salt_hex).map_err(|_| CipherError::InvalidHex)?;
	let expected_mac = hex::decode(mac_hex).map_err(|_| CipherError::InvalidHex)?;
	let ciphertext = hex::decode(ciphertext_hex).map_err(|_| CipherError::InvalidHex)?;
	if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
		return Err(CipherError::MalformedBody("ciphertext is not block aligned"));
	}

	let keys = derive_keys(password.expose().as_bytes(), &salt);
	let (cipher_key, rest) = keys.split_at(KEY_SIZE);
	let (mac_key, iv) = rest.split_at(KEY_SIZE);

	let mut mac =
		<HmacSha256 as Mac>::new_from_slice(mac_key).map_err(|_| CipherError::InvalidKeyLength)?;
	mac.update(&ciphertext);
	mac
		.verify_slice(&expected_mac)
		.map_err(|_| CipherError::IntegrityCheckFailed)?;

	let mut buf = Zeroizing::new(ciphertext);
	let mut cipher =
		Aes256Ctr::new_from_slices(cipher_key, iv).map_err(|_| CipherError::InvalidKeyLength)?;
	cipher.apply_keystream(buf.as_mut_slice());

	let len = unpadded_len(&buf)?;
	buf.truncate(len);
	Ok(buf)
}

fn encrypt_with_salt(
	plaintext: &[u8],
	password: &[u8],
	salt: &[u8],
) -> Result<Vec<u8>, CipherError> {
	let keys = derive_keys(password, salt);
	let (cipher_key, rest) = keys.split_at(KEY_SIZE);
	let (mac_key, iv) = rest.split_at(KEY_SIZE);

	let mut buf = Zeroizing::new(pad(plaintext));
	let mut cipher =
		Aes256Ctr::new_from_slices(cipher_key, iv).map_err(|_| CipherError::InvalidKeyLength)?;
	cipher.apply_keystream(buf.as_mut_slice());

	let mut mac =
		<HmacSha256 as Mac>::new_from_slice(mac_key).map_err(|_| CipherError::InvalidKeyLength)?;
	mac.update(&buf);
	let tag = mac.finalize().into_bytes();

	let inner = [hex::encode(salt), hex::encode(tag), hex::encode(buf.as_slice())].join("\n");
	let body = hex::encode(inner.as_bytes());

	let mut out = Vec::with_capacity(HEADER.len() + body.len() + body.len() / LINE_WIDTH + 2);
	out.extend_from_slice(HEADER.as_bytes());
	for line in body.as_bytes().chunks(LINE_WIDTH) {
		out.push(b'\n');
		out.extend_from_slice(line);
	}
	out.push(b'\n');
	Ok(out)
}

/// Validate the header line and return the joined hex body.
fn parse_envelope(data: &[u8]) -> Result<String, CipherError> {
	let text = std::str::from_utf8(data).map_err(|_| CipherError::MalformedHeader)?;
	let mut lines = text.lines();
	let header = lines.next().ok_or(CipherError::MalformedHeader)?;

	let fields: Vec<&str> = header.trim().split(';').map(str::trim).collect();
	if fields.len() < 3 || fields[0].as_bytes() != VAULT_MARKER {
		return Err(CipherError::MalformedHeader);
	}
	// 1.2 only adds a vault id after the cipher name.
	if !matches!(fields[1], "1.1" | "1.2") || fields[2] != CIPHER_NAME {
		return Err(CipherError::Unsupported {
			version: fields[1].to_string(),
			cipher: fields[2].to_string(),
		});
	}

	let body: String = lines.map(str::trim).collect();
	if body.is_empty() {
		return Err(CipherError::MalformedBody("empty body"));
	}
	Ok(body)
}

fn derive_keys(password: &[u8], salt: &[u8]) -> Zeroizing<[u8; 2 * KEY_SIZE + IV_SIZE]> {
	let mut out = Zeroizing::new([0u8; 2 * KEY_SIZE + IV_SIZE]);
	pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, KDF_ROUNDS, &mut out[..]);
	out
}

fn pad(plaintext: &[u8]) -> Vec<u8> {
	let pad_len = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
	let mut out = Vec::with_capacity(plaintext.len() + pad_len);
	out.extend_from_slice(plaintext);
	out.resize(plaintext.len() + pad_len, pad_len as u8);
	out
}

fn unpadded_len(buf: &[u8]) -> Result<usize, CipherError> {
	let pad_len = *buf.last().ok_or(CipherError::InvalidPadding)? as usize;
	if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > buf.len() {
		return Err(CipherError::InvalidPadding);
	}
	if buf[buf.len() - pad_len..]
		.iter()
		.any(|b| *b as usize != pad_len)
	{
		return Err(CipherError::InvalidPadding);
	}
	Ok(buf.len() - pad_len)
}
