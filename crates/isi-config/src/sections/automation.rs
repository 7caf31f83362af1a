// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Playbook rendering and engine invocation settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPLATES_DIR: &str = "Templates";
pub const DEFAULT_OUTPUT_DIR: &str = "playbooks";
pub const DEFAULT_ENGINE_PROGRAM: &str = "ansible-runner";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AutomationConfigLayer {
	pub templates_dir: Option<PathBuf>,
	pub output_dir: Option<PathBuf>,
	pub engine_program: Option<String>,
	pub debug: Option<bool>,
}

impl AutomationConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.templates_dir.is_some() {
			self.templates_dir = other.templates_dir;
		}
		if other.output_dir.is_some() {
			self.output_dir = other.output_dir;
		}
		if other.engine_program.is_some() {
			self.engine_program = other.engine_program;
		}
		if other.debug.is_some() {
			self.debug = other.debug;
		}
	}

	pub fn finalize(self) -> AutomationConfig {
		AutomationConfig {
			templates_dir: self
				.templates_dir
				.unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR)),
			output_dir: self
				.output_dir
				.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
			engine_program: self
				.engine_program
				.unwrap_or_else(|| DEFAULT_ENGINE_PROGRAM.to_string()),
			debug: self.debug.unwrap_or(false),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomationConfig {
	/// Directory holding `*.yml.j2` playbook templates.
	pub templates_dir: PathBuf,
	/// Audit trail of rendered playbooks; also the engine's private data dir.
	pub output_dir: PathBuf,
	pub engine_program: String,
	/// Verbose engine output and rendered-document logging.
	pub debug: bool,
}

impl Default for AutomationConfig {
	fn default() -> Self {
		AutomationConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = AutomationConfig::default();
		assert_eq!(config.templates_dir, PathBuf::from("Templates"));
		assert_eq!(config.output_dir, PathBuf::from("playbooks"));
		assert_eq!(config.engine_program, "ansible-runner");
		assert!(!config.debug);
	}

	#[test]
	fn partial_toml_layer() {
		let layer: AutomationConfigLayer = toml::from_str(
			r#"
output_dir = "/var/lib/isi/playbooks"
debug = true
"#,
		)
		.unwrap();
		let config = layer.finalize();
		assert_eq!(config.output_dir, PathBuf::from("/var/lib/isi/playbooks"));
		assert!(config.debug);
		assert_eq!(config.templates_dir, PathBuf::from("Templates"));
	}

	#[test]
	fn merge_overwrites_only_set_fields() {
		let mut base = AutomationConfigLayer {
			engine_program: Some("/usr/bin/ansible-runner".to_string()),
			debug: Some(true),
			..Default::default()
		};
		base.merge(AutomationConfigLayer {
			debug: Some(false),
			..Default::default()
		});
		assert_eq!(
			base.engine_program.as_deref(),
			Some("/usr/bin/ansible-runner")
		);
		assert_eq!(base.debug, Some(false));
	}
}
