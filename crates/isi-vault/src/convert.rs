// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Whole-file conversion between plaintext YAML and the vault envelope.

use std::path::Path;

use isi_common_secret::SecretString;
use tokio::io::AsyncWriteExt;
use tracing::info;
use zeroize::Zeroizing;

use crate::cipher::{self, classify_payload, VaultPayload};
use crate::error::{Result, VaultError};

async fn read(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
	tokio::fs::read(path)
		.await
		.map(Zeroizing::new)
		.map_err(|source| VaultError::Io {
			path: path.to_path_buf(),
			source,
		})
}

async fn overwrite(path: &Path, data: &[u8]) -> Result<()> {
	let io_err = |source| VaultError::Io {
		path: path.to_path_buf(),
		source,
	};
	let mut file = tokio::fs::OpenOptions::new()
		.write(true)
		.truncate(true)
		.open(path)
		.await
		.map_err(io_err)?;
	file.write_all(data).await.map_err(io_err)?;
	file.sync_all().await.map_err(io_err)
}

fn decrypt_payload(path: &Path, data: &[u8], password: &SecretString) -> Result<Zeroizing<Vec<u8>>> {
	cipher::decrypt(data, password).map_err(|source| VaultError::Decryption {
		path: path.to_path_buf(),
		source,
	})
}

/// Encrypt a plaintext file in place.
pub async fn encrypt_file(path: &Path, password: &SecretString) -> Result<()> {
	let data = read(path).await?;
	let VaultPayload::Plaintext(plaintext) = classify_payload(&data) else {
		return Err(VaultError::AlreadyEncrypted {
			path: path.to_path_buf(),
		});
	};
	let encrypted = cipher::encrypt(plaintext, password).map_err(VaultError::Encryption)?;
	overwrite(path, &encrypted).await?;
	info!(path = %path.display(), "file encrypted");
	Ok(())
}

/// Decrypt a vault file in place.
pub async fn decrypt_file(path: &Path, password: &SecretString) -> Result<()> {
	let data = read(path).await?;
	let VaultPayload::Encrypted(encrypted) = classify_payload(&data) else {
		return Err(VaultError::NotEncrypted {
			path: path.to_path_buf(),
		});
	};
	let plaintext = decrypt_payload(path, encrypted, password)?;
	overwrite(path, &plaintext).await?;
	info!(path = %path.display(), "file decrypted");
	Ok(())
}

/// Return the plaintext of a file, decrypting when needed.
pub async fn view_file(path: &Path, password: Option<&SecretString>) -> Result<Zeroizing<String>> {
	let data = read(path).await?;
	let plaintext = match classify_payload(&data) {
		VaultPayload::Plaintext(bytes) => Zeroizing::new(bytes.to_vec()),
		VaultPayload::Encrypted(bytes) => {
			let password = password.ok_or_else(|| VaultError::PasswordRequired {
				path: path.to_path_buf(),
			})?;
			decrypt_payload(path, bytes, password)?
		}
	};
	String::from_utf8(plaintext.to_vec())
		.map(Zeroizing::new)
		.map_err(|_| VaultError::InvalidUtf8 {
			path: path.to_path_buf(),
		})
}
