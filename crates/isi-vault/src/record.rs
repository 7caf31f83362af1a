// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster records and the YAML document they are stored in.

use indexmap::IndexMap;
use isi_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// OneFS platform API port used when a record omits one.
pub const DEFAULT_PORT: u16 = 8080;

/// Connection record for one cluster, including its password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCredentials {
	pub name: String,
	pub host: String,
	pub port: u16,
	pub username: String,
	pub password: SecretString,
	pub verify_ssl: bool,
}

impl ClusterCredentials {
	pub fn new(
		name: impl Into<String>,
		host: impl Into<String>,
		port: u16,
		username: impl Into<String>,
		password: SecretString,
		verify_ssl: bool,
	) -> Self {
		Self {
			name: name.into(),
			host: host.into(),
			port,
			username: username.into(),
			password,
			verify_ssl,
		}
	}

	pub(crate) fn from_persisted(name: String, persisted: PersistedCluster) -> Self {
		Self {
			name,
			host: persisted.host,
			port: persisted.port,
			username: persisted.username,
			password: persisted.password,
			verify_ssl: persisted.verify_ssl,
		}
	}
}

/// Public view of a record returned by listings. Carries no username or
/// password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
	pub name: String,
	pub host: String,
	pub port: u16,
	pub verify_ssl: bool,
	pub selected: bool,
}

/// Prefix `https://` unless the host already names a scheme.
pub fn normalize_host(host: &str) -> String {
	if host.starts_with("http://") || host.starts_with("https://") {
		host.to_string()
	} else {
		format!("https://{host}")
	}
}

/// A record as read from the vault file. Absent fields take defaults.
#[derive(Debug, Deserialize)]
pub(crate) struct PersistedCluster {
	#[serde(default)]
	host: String,
	#[serde(default = "default_port")]
	port: u16,
	#[serde(default)]
	username: String,
	#[serde(default = "empty_password")]
	password: SecretString,
	#[serde(default)]
	verify_ssl: bool,
}

fn default_port() -> u16 {
	DEFAULT_PORT
}

fn empty_password() -> SecretString {
	SecretString::new(String::new())
}

#[derive(Debug, Default, Deserialize)]
struct VaultDocument {
	#[serde(default)]
	clusters: Option<IndexMap<String, PersistedCluster>>,
}

/// Borrowed form used for writing. `SecretString` serializes redacted, so
/// the password is exposed explicitly here and nowhere else.
#[derive(Serialize)]
struct PersistedClusterRef<'a> {
	host: &'a str,
	port: u16,
	username: &'a str,
	password: &'a str,
	verify_ssl: bool,
}

#[derive(Serialize)]
struct VaultDocumentRef<'a> {
	clusters: IndexMap<&'a str, PersistedClusterRef<'a>>,
}

/// Parse decrypted or plaintext vault YAML into records, keeping file order.
pub(crate) fn parse_document(
	text: &str,
) -> Result<IndexMap<String, ClusterCredentials>, serde_yaml::Error> {
	if text.trim().is_empty() {
		return Ok(IndexMap::new());
	}
	let doc: Option<VaultDocument> = serde_yaml::from_str(text)?;
	Ok(doc
		.and_then(|d| d.clusters)
		.unwrap_or_default()
		.into_iter()
		.map(|(name, persisted)| {
			let record = ClusterCredentials::from_persisted(name.clone(), persisted);
			(name, record)
		})
		.collect())
}

/// Serialize records into the `{clusters: ...}` document.
pub(crate) fn encode_document(
	records: &IndexMap<String, ClusterCredentials>,
) -> Result<Zeroizing<String>, serde_yaml::Error> {
	let doc = VaultDocumentRef {
		clusters: records
			.iter()
			.map(|(name, record)| {
				(
					name.as_str(),
					PersistedClusterRef {
						host: &record.host,
						port: record.port,
						username: &record.username,
						password: record.password.expose(),
						verify_ssl: record.verify_ssl,
					},
				)
			})
			.collect(),
	};
	serde_yaml::to_string(&doc).map(Zeroizing::new)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalize_adds_https_only_when_missing() {
		assert_eq!(normalize_host("10.0.0.2"), "https://10.0.0.2");
		assert_eq!(normalize_host("https://a.example"), "https://a.example");
		assert_eq!(normalize_host("http://a.example"), "http://a.example");
	}

	#[test]
	fn parse_applies_defaults_and_keeps_order() {
		let records = parse_document(
			r#"
clusters:
  zeta:
    host: https://10.0.0.9
    username: admin
    password: pw
  alpha:
    host: https://10.0.0.1
    port: 443
    username: root
    password: other
    verify_ssl: true
"#,
		)
		.unwrap();

		let names: Vec<&str> = records.keys().map(String::as_str).collect();
		assert_eq!(names, vec!["zeta", "alpha"]);
		assert_eq!(records["zeta"].port, DEFAULT_PORT);
		assert!(!records["zeta"].verify_ssl);
		assert_eq!(records["alpha"].port, 443);
		assert!(records["alpha"].verify_ssl);
		assert_eq!(records["alpha"].password.expose(), "other");
	}

	#[test]
	fn parse_empty_and_null_documents() {
		assert!(parse_document("").unwrap().is_empty());
		assert!(parse_document("clusters:\n").unwrap().is_empty());
		assert!(parse_document("{}\n").unwrap().is_empty());
	}

	#[test]
	fn parse_rejects_malformed_yaml() {
		assert!(parse_document("clusters: [unterminated").is_err());
		assert!(parse_document("clusters:\n  a:\n    port: not-a-number\n").is_err());
	}

	#[test]
	fn encode_writes_the_real_password() {
		let mut records = IndexMap::new();
		records.insert(
			"prod".to_string(),
			ClusterCredentials::new(
				"prod",
				"https://10.0.0.1",
				8080,
				"root",
				SecretString::from("s3cr3t"),
				false,
			),
		);
		let text = encode_document(&records).unwrap();
		assert!(text.contains("password: s3cr3t"));
		assert!(!text.contains("REDACTED"));

		let back = parse_document(&text).unwrap();
		assert_eq!(back, records);
	}

	#[test]
	fn summary_serializes_without_secrets() {
		let summary = ClusterSummary {
			name: "prod".to_string(),
			host: "https://10.0.0.1".to_string(),
			port: 8080,
			verify_ssl: false,
			selected: true,
		};
		let json = serde_json::to_value(&summary).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"name": "prod",
				"host": "https://10.0.0.1",
				"port": 8080,
				"verify_ssl": false,
				"selected": true,
			})
		);
	}
}
