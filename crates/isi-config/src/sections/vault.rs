// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential vault configuration section.

use std::path::PathBuf;

use isi_common_secret::SecretString;
use serde::{Deserialize, Serialize};

use crate::env::read_secret_file;
use crate::error::ConfigError;

pub const DEFAULT_VAULT_FILE: &str = "/app/vault/vault.yml";

/// Vault section as read from a single source.
///
/// The password itself is never read from TOML. A file may name a
/// `password_file`; the direct value only arrives through the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VaultConfigLayer {
	pub file: Option<PathBuf>,
	pub password_file: Option<PathBuf>,
	#[serde(skip)]
	pub password: Option<SecretString>,
}

impl VaultConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.file.is_some() {
			self.file = other.file;
		}
		if other.password_file.is_some() {
			self.password_file = other.password_file;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
	}

	pub fn finalize(self) -> Result<VaultConfig, ConfigError> {
		let password = match (self.password, self.password_file) {
			(Some(password), _) => Some(password),
			(None, Some(path)) => Some(
				read_secret_file(&path).map_err(|e| ConfigError::Secret(e.to_string()))?,
			),
			(None, None) => None,
		};

		Ok(VaultConfig {
			file: self
				.file
				.unwrap_or_else(|| PathBuf::from(DEFAULT_VAULT_FILE)),
			password,
		})
	}
}

/// Where the vault lives and what decrypts it.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultConfig {
	pub file: PathBuf,
	pub password: Option<SecretString>,
}

impl Default for VaultConfig {
	fn default() -> Self {
		Self {
			file: PathBuf::from(DEFAULT_VAULT_FILE),
			password: None,
		}
	}
}
