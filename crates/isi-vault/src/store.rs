// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The cluster vault: in-memory records backed by one encrypted file.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use isi_common_secret::SecretString;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cipher::{self, classify_payload, VaultPayload};
use crate::error::{Result, VaultError};
use crate::record::{
	encode_document, normalize_host, parse_document, ClusterCredentials, ClusterSummary,
};

/// Handle shared by hosts that mutate the vault from several tasks.
pub type SharedVault = Arc<Mutex<ClusterVault>>;

/// Named cluster records plus the currently selected one.
///
/// Every mutation re-encrypts and rewrites the whole backing file. The
/// selection lives only in memory and falls back to the first record in file
/// order after a load.
pub struct ClusterVault {
	path: PathBuf,
	password: Option<SecretString>,
	records: IndexMap<String, ClusterCredentials>,
	selected: Option<String>,
}

impl std::fmt::Debug for ClusterVault {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterVault")
			.field("path", &self.path)
			.field("password_set", &self.password.is_some())
			.field("clusters", &self.records.len())
			.field("selected", &self.selected)
			.finish()
	}
}

impl ClusterVault {
	/// Create an empty vault bound to `path`. Nothing is read until
	/// [`ClusterVault::load`].
	pub fn new(path: impl Into<PathBuf>, password: Option<SecretString>) -> Self {
		Self {
			path: path.into(),
			password,
			records: IndexMap::new(),
			selected: None,
		}
	}

	/// Create and load in one step.
	pub async fn open(path: impl Into<PathBuf>, password: Option<SecretString>) -> Result<Self> {
		let mut vault = Self::new(path, password);
		vault.load().await?;
		Ok(vault)
	}

	pub fn into_shared(self) -> SharedVault {
		Arc::new(Mutex::new(self))
	}

	/// Read the backing file and replace the in-memory records.
	///
	/// Plaintext YAML loads without a password; an encrypted file requires
	/// one. On error the previous state is left untouched.
	#[instrument(skip(self), fields(path = %self.path.display()))]
	pub async fn load(&mut self) -> Result<()> {
		let bytes = tokio::fs::read(&self.path)
			.await
			.map_err(|source| VaultError::Io {
				path: self.path.clone(),
				source,
			})?;

		let records = match classify_payload(&bytes) {
			VaultPayload::Encrypted(data) => {
				let password = self
					.password
					.as_ref()
					.ok_or_else(|| VaultError::PasswordRequired {
						path: self.path.clone(),
					})?;
				let plaintext =
					cipher::decrypt(data, password).map_err(|source| VaultError::Decryption {
						path: self.path.clone(),
						source,
					})?;
				let text = std::str::from_utf8(&plaintext).map_err(|_| VaultError::InvalidUtf8 {
					path: self.path.clone(),
				})?;
				debug!("decrypted vault file");
				self.parse(text)?
			}
			VaultPayload::Plaintext(data) => {
				let text = std::str::from_utf8(data).map_err(|_| VaultError::InvalidUtf8 {
					path: self.path.clone(),
				})?;
				debug!("vault file is plaintext, loading without password");
				self.parse(text)?
			}
		};

		self.selected = records.keys().next().cloned();
		self.records = records;
		info!(
			clusters = self.records.len(),
			selected = ?self.selected,
			"vault loaded"
		);
		Ok(())
	}

	fn parse(&self, text: &str) -> Result<IndexMap<String, ClusterCredentials>> {
		parse_document(text).map_err(|source| VaultError::Parse {
			path: self.path.clone(),
			source,
		})
	}

	/// Encrypt the current records and overwrite the backing file in place.
	///
	/// The file is truncated and rewritten through the same inode so a
	/// bind-mounted vault keeps working.
	#[instrument(skip(self), fields(path = %self.path.display()))]
	pub async fn save(&self) -> Result<()> {
		let password = self
			.password
			.as_ref()
			.ok_or_else(|| VaultError::PasswordRequired {
				path: self.path.clone(),
			})?;
		let plaintext = encode_document(&self.records).map_err(VaultError::Encode)?;
		let encrypted =
			cipher::encrypt(plaintext.as_bytes(), password).map_err(VaultError::Encryption)?;

		let io_err = |source| VaultError::Io {
			path: self.path.clone(),
			source,
		};
		let mut file = tokio::fs::OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.open(&self.path)
			.await
			.map_err(io_err)?;
		file.write_all(&encrypted).await.map_err(io_err)?;
		file.sync_all().await.map_err(io_err)?;

		debug!(clusters = self.records.len(), "vault saved");
		Ok(())
	}

	/// Insert or replace a record and persist.
	///
	/// The host gains an `https://` scheme when it has none. The new record
	/// becomes selected only when nothing was selected. If persisting fails
	/// the in-memory state is restored.
	#[instrument(skip(self, record), fields(cluster = %record.name))]
	pub async fn add_cluster(&mut self, mut record: ClusterCredentials) -> Result<()> {
		record.host = normalize_host(&record.host);
		let name = record.name.clone();

		let previous_selected = self.selected.clone();
		let (index, previous) = self.records.insert_full(name.clone(), record);
		if self.selected.is_none() {
			self.selected = Some(name.clone());
		}

		if let Err(e) = self.save().await {
			warn!(error = %e, "failed to persist new cluster, rolling back");
			match previous {
				Some(old) => {
					self.records.insert(name, old);
				}
				None => {
					self.records.shift_remove_index(index);
				}
			}
			self.selected = previous_selected;
			return Err(e);
		}

		info!(replaced = previous.is_some(), "cluster added");
		Ok(())
	}

	/// Delete a record and persist. Returns `false` when no such record
	/// exists.
	///
	/// Removing the selected record selects the first remaining one.
	#[instrument(skip(self))]
	pub async fn remove_cluster(&mut self, name: &str) -> Result<bool> {
		let Some((index, key, record)) = self.records.shift_remove_full(name) else {
			debug!("cluster not found");
			return Ok(false);
		};

		let previous_selected = self.selected.clone();
		if self.selected.as_deref() == Some(name) {
			self.selected = self.records.keys().next().cloned();
		}

		if let Err(e) = self.save().await {
			warn!(error = %e, "failed to persist removal, rolling back");
			self.records.shift_insert(index, key, record);
			self.selected = previous_selected;
			return Err(e);
		}

		info!(selected = ?self.selected, "cluster removed");
		Ok(true)
	}

	/// Make `name` the active record. Not persisted.
	pub fn select_cluster(&mut self, name: &str) -> bool {
		if !self.records.contains_key(name) {
			debug!(cluster = name, "cannot select unknown cluster");
			return false;
		}
		self.selected = Some(name.to_string());
		info!(cluster = name, "cluster selected");
		true
	}

	/// Public fields of every record, in file order.
	pub fn list_clusters(&self) -> Vec<ClusterSummary> {
		self.records
			.values()
			.map(|r| ClusterSummary {
				name: r.name.clone(),
				host: r.host.clone(),
				port: r.port,
				verify_ssl: r.verify_ssl,
				selected: self.selected.as_deref() == Some(r.name.as_str()),
			})
			.collect()
	}

	pub fn selected_name(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	/// The full selected record, password included.
	pub fn selected_credentials(&self) -> Option<ClusterCredentials> {
		self.selected
			.as_ref()
			.and_then(|name| self.records.get(name))
			.cloned()
	}

	/// Look up any record by name, password included.
	pub fn credentials(&self, name: &str) -> Option<ClusterCredentials> {
		self.records.get(name).cloned()
	}

	/// Every non-empty cluster password in the vault.
	pub fn passwords(&self) -> Vec<SecretString> {
		self.records
			.values()
			.filter(|r| !r.password.expose().is_empty())
			.map(|r| r.password.clone())
			.collect()
	}

	/// Discard in-memory state and load the file again.
	pub async fn reload(&mut self) -> Result<()> {
		self.records.clear();
		self.selected = None;
		self.load().await
	}
}
