// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use isi_common_secret::SecretString;
use isi_config::IsiConfig;

fn password(config: &IsiConfig) -> Result<&SecretString> {
	config
		.vault
		.password
		.as_ref()
		.ok_or_else(|| anyhow!("no vault password configured: set VAULT_PASSWORD or VAULT_PASSWORD_FILE"))
}

pub async fn encrypt(config: &IsiConfig, file: &Path) -> Result<()> {
	isi_vault::encrypt_file(file, password(config)?)
		.await
		.with_context(|| format!("failed to encrypt {}", file.display()))?;
	println!("encrypted {}", file.display());
	Ok(())
}

pub async fn decrypt(config: &IsiConfig, file: &Path) -> Result<()> {
	isi_vault::decrypt_file(file, password(config)?)
		.await
		.with_context(|| format!("failed to decrypt {}", file.display()))?;
	println!("decrypted {}", file.display());
	Ok(())
}

pub async fn view(config: &IsiConfig, file: &Path) -> Result<()> {
	let text = isi_vault::view_file(file, config.vault.password.as_ref())
		.await
		.with_context(|| format!("failed to read {}", file.display()))?;
	print!("{}", text.as_str());
	Ok(())
}
