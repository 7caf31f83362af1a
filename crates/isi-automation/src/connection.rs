// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connection handle built from a vault record.

use isi_common_secret::SecretString;
use isi_vault::ClusterCredentials;
use serde_json::{Map, Value};
use zeroize::Zeroizing;

/// Template variable that receives the API user at run time.
pub const API_USER_KEY: &str = "api_user";
/// Template variable that receives the API password at run time.
pub const API_PASSWORD_KEY: &str = "api_password";

/// Everything needed to talk to one cluster.
#[derive(Debug, Clone)]
pub struct ClusterConnection {
	pub name: String,
	pub host: String,
	pub port: u16,
	pub username: String,
	pub password: SecretString,
	pub verify_ssl: bool,
}

impl From<ClusterCredentials> for ClusterConnection {
	fn from(record: ClusterCredentials) -> Self {
		Self {
			name: record.name,
			host: record.host,
			port: record.port,
			username: record.username,
			password: record.password,
			verify_ssl: record.verify_ssl,
		}
	}
}

impl ClusterConnection {
	/// Host without scheme, port or path: `https://10.0.0.1:8080/` gives
	/// `10.0.0.1`.
	pub fn bare_host(&self) -> String {
		let host = self
			.host
			.strip_prefix("https://")
			.or_else(|| self.host.strip_prefix("http://"))
			.unwrap_or(&self.host);
		let host = host.split('/').next().unwrap_or_default();
		host.split(':').next().unwrap_or_default().to_string()
	}

	/// Non-secret parameters for templates. Credential keys hold literal
	/// placeholder tokens that the engine resolves from the side channel.
	pub fn template_parameters(&self) -> Map<String, Value> {
		let mut params = Map::new();
		params.insert("onefs_host".into(), Value::String(self.bare_host()));
		params.insert("port_no".into(), Value::String(self.port.to_string()));
		params.insert("verify_ssl".into(), Value::Bool(self.verify_ssl));
		params.insert(API_USER_KEY.into(), Value::String(placeholder(API_USER_KEY)));
		params.insert(
			API_PASSWORD_KEY.into(),
			Value::String(placeholder(API_PASSWORD_KEY)),
		);
		params
	}

	/// Real credentials, keyed like the placeholders.
	pub fn side_channel(&self) -> SideChannel {
		SideChannel {
			api_user: self.username.clone(),
			api_password: self.password.clone(),
		}
	}
}

fn placeholder(key: &str) -> String {
	format!("{{{{ {key} }}}}")
}

/// Runtime-only credential variables handed to the engine.
#[derive(Debug, Clone)]
pub struct SideChannel {
	pub api_user: String,
	pub api_password: SecretString,
}

impl SideChannel {
	/// JSON object of the extra variables, password in clear.
	pub fn to_json(&self) -> Zeroizing<String> {
		let mut vars = Map::new();
		vars.insert(API_USER_KEY.into(), Value::String(self.api_user.clone()));
		vars.insert(
			API_PASSWORD_KEY.into(),
			Value::String(self.api_password.expose().clone()),
		);
		Zeroizing::new(Value::Object(vars).to_string())
	}
}
