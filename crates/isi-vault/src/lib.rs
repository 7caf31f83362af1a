// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encrypted store of per-cluster connection credentials.
//!
//! The backing file is YAML of the form
//!
//! ```yaml
//! clusters:
//!   prod:
//!     host: https://10.0.0.1
//!     port: 8080
//!     username: root
//!     password: s3cr3t
//!     verify_ssl: false
//! ```
//!
//! either as plaintext or wrapped in an Ansible Vault 1.1 envelope, so
//! `ansible-vault edit` works on the same file.

pub mod cipher;
pub mod convert;
pub mod error;
pub mod record;
pub mod store;

pub use cipher::{classify_payload, CipherError, VaultPayload, VAULT_MARKER};
pub use convert::{decrypt_file, encrypt_file, view_file};
pub use error::{Result, VaultError};
pub use record::{normalize_host, ClusterCredentials, ClusterSummary, DEFAULT_PORT};
pub use store::{ClusterVault, SharedVault};
