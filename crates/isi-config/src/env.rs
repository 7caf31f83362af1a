// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Secret lookup with the `VAR` / `VAR_FILE` convention.
//!
//! `VAULT_PASSWORD_FILE=/run/secrets/vault_password` is preferred over
//! `VAULT_PASSWORD` so the password can come from a Docker or Kubernetes secret
//! mount instead of the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use isi_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load `var` from the process environment, honouring `{var}_FILE`.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	load_secret_with(var, |name| std::env::var(name).ok())
}

/// Same as [`load_secret_env`] but resolves variables through `lookup`.
///
/// `{var}_FILE` wins over `{var}`. One trailing newline is stripped from file
/// contents; an empty direct value counts as unset.
pub fn load_secret_with<F>(var: &str, lookup: F) -> Result<Option<SecretString>, SecretEnvError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");

	if let Some(path) = lookup(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		return read_secret_file(Path::new(&path)).map(Some);
	}

	Ok(lookup(var)
		.filter(|value| !value.is_empty())
		.map(SecretString::new))
}

/// Read a secret from a file, dropping a single trailing newline.
pub fn read_secret_file(path: &Path) -> Result<SecretString, SecretEnvError> {
	let mut content = fs::read_to_string(path).map_err(|source| SecretEnvError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	if content.ends_with('\n') {
		content.pop();
		if content.ends_with('\r') {
			content.pop();
		}
	}
	Ok(SecretString::new(content))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn lookup<'a>(vars: &'a HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> + 'a {
		move |name| vars.get(name).cloned()
	}

	#[test]
	fn unset_returns_none() {
		let vars = HashMap::new();
		assert!(load_secret_with("VAULT_PASSWORD", lookup(&vars))
			.unwrap()
			.is_none());
	}

	#[test]
	fn direct_value_is_used() {
		let vars = HashMap::from([("VAULT_PASSWORD", "s3cret".to_string())]);
		let secret = load_secret_with("VAULT_PASSWORD", lookup(&vars))
			.unwrap()
			.unwrap();
		assert_eq!(secret.expose(), "s3cret");
	}

	#[test]
	fn empty_direct_value_counts_as_unset() {
		let vars = HashMap::from([("VAULT_PASSWORD", String::new())]);
		assert!(load_secret_with("VAULT_PASSWORD", lookup(&vars))
			.unwrap()
			.is_none());
	}

	#[test]
	fn file_variant_takes_precedence_and_strips_newline() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();

		let vars = HashMap::from([
			("VAULT_PASSWORD", "from-env".to_string()),
			(
				"VAULT_PASSWORD_FILE",
				file.path().to_string_lossy().to_string(),
			),
		]);
		let secret = load_secret_with("VAULT_PASSWORD", lookup(&vars))
			.unwrap()
			.unwrap();
		assert_eq!(secret.expose(), "from-file");
	}

	#[test]
	fn empty_file_path_is_an_error() {
		let vars = HashMap::from([("VAULT_PASSWORD_FILE", String::new())]);
		let err = load_secret_with("VAULT_PASSWORD", lookup(&vars)).unwrap_err();
		assert!(matches!(err, SecretEnvError::EmptyPath { .. }));
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let vars = HashMap::from([(
			"VAULT_PASSWORD_FILE",
			"/nonexistent/isi/vault_password".to_string(),
		)]);
		let err = load_secret_with("VAULT_PASSWORD", lookup(&vars)).unwrap_err();
		assert!(matches!(err, SecretEnvError::Io { .. }));
	}
}
