// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

use crate::cipher::CipherError;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
	#[error("failed to access vault file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("vault file {path} is encrypted but no vault password is configured (set VAULT_PASSWORD)")]
	PasswordRequired { path: PathBuf },

	#[error("failed to decrypt vault file {path}: {source}")]
	Decryption {
		path: PathBuf,
		#[source]
		source: CipherError,
	},

	#[error("failed to encrypt vault: {0}")]
	Encryption(#[source] CipherError),

	#[error("vault file {path} is not valid YAML: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	#[error("failed to serialize vault contents: {0}")]
	Encode(#[source] serde_yaml::Error),

	#[error("vault file {path} is not valid UTF-8")]
	InvalidUtf8 { path: PathBuf },

	#[error("{path} is already encrypted")]
	AlreadyEncrypted { path: PathBuf },

	#[error("{path} is not encrypted")]
	NotEncrypted { path: PathBuf },
}
