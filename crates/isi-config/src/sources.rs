// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, environment and CLI flags.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::load_secret_with;
use crate::error::ConfigError;
use crate::layer::IsiConfigLayer;
use crate::sections::{AutomationConfigLayer, LogFormat, LoggingConfigLayer, VaultConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<IsiConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<IsiConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(IsiConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	/// A file that is skipped when absent.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	/// A file the user asked for explicitly; absence is an error.
	pub fn required(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	pub fn system() -> Self {
		Self::new("/etc/isi/config.toml")
	}

	/// `$XDG_CONFIG_HOME/isi/config.toml`, when a config directory is known.
	pub fn user() -> Option<Self> {
		dirs::config_dir().map(|dir| Self::new(dir.join("isi").join("config.toml")))
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<IsiConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::FileNotFound(self.path.clone()));
			}
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(IsiConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: IsiConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Variable names follow the deployment contract of the container image:
/// `VAULT_FILE`, `VAULT_PASSWORD`, `PLAYBOOKS_DIR`, `DEBUG`, ...
pub struct EnvSource {
	lookup: Lookup,
}

impl EnvSource {
	pub fn new() -> Self {
		Self::with_lookup(|name| std::env::var(name).ok())
	}

	/// Resolve variables through `lookup` instead of the process environment.
	pub fn with_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String> + Send + Sync + 'static,
	{
		Self {
			lookup: Box::new(lookup),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn path(&self, name: &str) -> Option<PathBuf> {
		self.var(name).map(PathBuf::from)
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name).map(|v| {
			!matches!(
				v.to_ascii_lowercase().as_str(),
				"0" | "false" | "no" | "off"
			)
		})
	}

	fn load_vault(&self) -> Result<VaultConfigLayer, ConfigError> {
		let password = load_secret_with("VAULT_PASSWORD", |name| (self.lookup)(name))
			.map_err(|e| ConfigError::Secret(e.to_string()))?;
		Ok(VaultConfigLayer {
			file: self.path("VAULT_FILE"),
			password_file: None,
			password,
		})
	}

	fn load_automation(&self) -> AutomationConfigLayer {
		AutomationConfigLayer {
			templates_dir: self.path("TEMPLATES_DIR"),
			output_dir: self.path("PLAYBOOKS_DIR"),
			engine_program: self.var("ISI_ENGINE_PROGRAM"),
			debug: self.bool("DEBUG"),
		}
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = match self.var("ISI_LOG_FORMAT") {
			Some(v) => Some(v.parse::<LogFormat>().map_err(|message| {
				ConfigError::InvalidValue {
					key: "ISI_LOG_FORMAT".to_string(),
					message,
				}
			})?),
			None => None,
		};
		Ok(LoggingConfigLayer {
			level: self.var("ISI_LOG_LEVEL"),
			format,
		})
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<IsiConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(IsiConfigLayer {
			vault: Some(self.load_vault()?),
			automation: Some(self.load_automation()),
			logging: Some(self.load_logging()?),
		})
	}
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub vault_file: Option<PathBuf>,
	pub templates_dir: Option<PathBuf>,
	pub output_dir: Option<PathBuf>,
	pub debug: Option<bool>,
	pub log_level: Option<String>,
	pub log_format: Option<LogFormat>,
}

pub struct CliSource {
	overrides: CliOverrides,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<IsiConfigLayer, ConfigError> {
		let o = self.overrides.clone();
		Ok(IsiConfigLayer {
			vault: Some(VaultConfigLayer {
				file: o.vault_file,
				..Default::default()
			}),
			automation: Some(AutomationConfigLayer {
				templates_dir: o.templates_dir,
				output_dir: o.output_dir,
				engine_program: None,
				debug: o.debug,
			}),
			logging: Some(LoggingConfigLayer {
				level: o.log_level,
				format: o.log_format,
			}),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	fn env(vars: &[(&'static str, &str)]) -> EnvSource {
		let vars: HashMap<&'static str, String> =
			vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
		EnvSource::with_lookup(move |name| vars.get(name).cloned())
	}

	#[test]
	fn env_source_reads_deployment_variables() {
		let source = env(&[
			("VAULT_FILE", "/srv/vault.yml"),
			("VAULT_PASSWORD", "pw"),
			("PLAYBOOKS_DIR", "/srv/playbooks"),
			("DEBUG", "1"),
		]);
		let layer = source.load().unwrap();

		let vault = layer.vault.unwrap();
		assert_eq!(vault.file, Some(PathBuf::from("/srv/vault.yml")));
		assert_eq!(vault.password.unwrap().expose(), "pw");

		let automation = layer.automation.unwrap();
		assert_eq!(automation.output_dir, Some(PathBuf::from("/srv/playbooks")));
		assert_eq!(automation.debug, Some(true));
	}

	#[test]
	fn env_debug_false_values() {
		let layer = env(&[("DEBUG", "false")]).load().unwrap();
		assert_eq!(layer.automation.unwrap().debug, Some(false));

		let layer = env(&[]).load().unwrap();
		assert_eq!(layer.automation.unwrap().debug, None);
	}

	#[test]
	fn env_rejects_unknown_log_format() {
		let err = env(&[("ISI_LOG_FORMAT", "xml")]).load().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}

	#[test]
	fn optional_toml_missing_is_empty() {
		let layer = TomlSource::new("/nonexistent/isi/config.toml")
			.load()
			.unwrap();
		assert!(layer.vault.is_none());
	}

	#[test]
	fn required_toml_missing_is_error() {
		let err = TomlSource::required("/nonexistent/isi/config.toml")
			.load()
			.unwrap_err();
		assert!(matches!(err, ConfigError::FileNotFound(_)));
	}

	#[test]
	fn toml_parse_error_names_the_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[vault\nfile = ").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn precedence_order() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
		assert!(Precedence::Environment < Precedence::Cli);
	}
}
