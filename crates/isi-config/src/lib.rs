// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the cluster vault and the playbook runner.
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. `/etc/isi/config.toml`, then `$XDG_CONFIG_HOME/isi/config.toml`
//!    (or a single explicit file)
//! 3. Environment (`VAULT_FILE`, `VAULT_PASSWORD[_FILE]`, `PLAYBOOKS_DIR`, ...)
//! 4. Command-line overrides
//!
//! ```ignore
//! let config = isi_config::load_config(None, CliOverrides::default())?;
//! println!("vault at {}", config.vault.file.display());
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

use std::path::PathBuf;

use tracing::debug;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::IsiConfigLayer;
pub use sections::*;
pub use sources::{
	CliOverrides, CliSource, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource,
};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct IsiConfig {
	pub vault: VaultConfig,
	pub automation: AutomationConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all standard sources.
///
/// When `config_file` is given it replaces the system and user files and must
/// exist.
pub fn load_config(
	config_file: Option<PathBuf>,
	cli: CliOverrides,
) -> Result<IsiConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource)];
	match config_file {
		Some(path) => sources.push(Box::new(TomlSource::required(path))),
		None => {
			sources.push(Box::new(TomlSource::system()));
			if let Some(user) = TomlSource::user() {
				sources.push(Box::new(user));
			}
		}
	}
	sources.push(Box::new(EnvSource::new()));
	sources.push(Box::new(CliSource::new(cli)));

	load_from_sources(sources)
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<IsiConfig, ConfigError> {
	// Stable sort keeps system-before-user order within ConfigFile.
	sources.sort_by_key(|s| s.precedence());

	let mut merged = IsiConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: IsiConfigLayer) -> Result<IsiConfig, ConfigError> {
	let config = IsiConfig {
		vault: layer.vault.unwrap_or_default().finalize()?,
		automation: layer.automation.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	debug!(
		vault_file = %config.vault.file.display(),
		vault_password_set = config.vault.password.is_some(),
		templates_dir = %config.automation.templates_dir.display(),
		output_dir = %config.automation.output_dir.display(),
		debug = config.automation.debug,
		"configuration resolved"
	);

	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn env_overrides_file_and_cli_overrides_env() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[vault]
file = "/from/file.yml"

[automation]
output_dir = "/from/file/playbooks"
templates_dir = "/from/file/Templates"

[logging]
level = "warn"
"#
		)
		.unwrap();

		let env = EnvSource::with_lookup(|name| match name {
			"PLAYBOOKS_DIR" => Some("/from/env/playbooks".to_string()),
			"ISI_LOG_LEVEL" => Some("debug".to_string()),
			_ => None,
		});
		let cli = CliSource::new(CliOverrides {
			log_level: Some("trace".to_string()),
			..Default::default()
		});

		let config = load_from_sources(vec![
			Box::new(cli),
			Box::new(env),
			Box::new(TomlSource::required(file.path())),
			Box::new(DefaultsSource),
		])
		.unwrap();

		assert_eq!(config.vault.file, PathBuf::from("/from/file.yml"));
		assert_eq!(
			config.automation.output_dir,
			PathBuf::from("/from/env/playbooks")
		);
		assert_eq!(
			config.automation.templates_dir,
			PathBuf::from("/from/file/Templates")
		);
		assert_eq!(config.logging.level, "trace");
	}

	#[test]
	fn defaults_only() {
		let config = load_from_sources(vec![Box::new(DefaultsSource)]).unwrap();
		assert_eq!(config.vault.file, PathBuf::from(DEFAULT_VAULT_FILE));
		assert!(config.vault.password.is_none());
		assert_eq!(config.automation.engine_program, DEFAULT_ENGINE_PROGRAM);
	}
}
