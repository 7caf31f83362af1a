// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::{anyhow, bail, Context, Result};
use isi_vault::{ClusterCredentials, ClusterSummary, ClusterVault};
use tracing::instrument;

pub struct NewCluster {
	pub name: String,
	pub host: String,
	pub port: u16,
	pub username: String,
	pub verify_ssl: bool,
	pub password_env: String,
}

pub fn list(vault: &ClusterVault, json: bool) -> Result<()> {
	let clusters = vault.list_clusters();
	if json {
		println!("{}", serde_json::to_string_pretty(&clusters)?);
	} else {
		print!("{}", format_table(&clusters));
	}
	Ok(())
}

fn format_table(clusters: &[ClusterSummary]) -> String {
	if clusters.is_empty() {
		return "no clusters configured\n".to_string();
	}
	let width = clusters.iter().map(|c| c.name.len()).max().unwrap_or(0);
	clusters
		.iter()
		.map(|c| {
			let marker = if c.selected { '*' } else { ' ' };
			let tls = if c.verify_ssl { "verify" } else { "no-verify" };
			format!(
				"{marker} {:width$}  {}:{}  {tls}\n",
				c.name, c.host, c.port
			)
		})
		.collect()
}

#[instrument(skip_all, fields(cluster = %new.name))]
pub async fn add(vault: &mut ClusterVault, new: NewCluster) -> Result<()> {
	let password = isi_config::load_secret_env(&new.password_env)
		.with_context(|| format!("failed to read {}", new.password_env))?
		.ok_or_else(|| {
			anyhow!(
				"no password given: set {} or {}_FILE",
				new.password_env,
				new.password_env
			)
		})?;
	if new.username.is_empty() {
		bail!("username must not be empty");
	}

	let name = new.name.clone();
	vault
		.add_cluster(ClusterCredentials::new(
			new.name,
			new.host,
			new.port,
			new.username,
			password,
			new.verify_ssl,
		))
		.await
		.context("failed to save vault")?;
	println!("added cluster {name}");
	Ok(())
}

pub async fn remove(vault: &mut ClusterVault, name: &str) -> Result<()> {
	if !vault
		.remove_cluster(name)
		.await
		.context("failed to save vault")?
	{
		bail!("no cluster named '{name}'");
	}
	println!("removed cluster {name}");
	Ok(())
}
