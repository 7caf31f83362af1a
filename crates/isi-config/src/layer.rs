// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{AutomationConfigLayer, LoggingConfigLayer, VaultConfigLayer};

/// One source's view of the configuration; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IsiConfigLayer {
	#[serde(default)]
	pub vault: Option<VaultConfigLayer>,
	#[serde(default)]
	pub automation: Option<AutomationConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl IsiConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: IsiConfigLayer) {
		merge_option(&mut self.vault, other.vault, VaultConfigLayer::merge);
		merge_option(
			&mut self.automation,
			other.automation,
			AutomationConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = IsiConfigLayer::default();
		base.merge(IsiConfigLayer::default());
		assert!(base.vault.is_none());
		assert!(base.automation.is_none());
		assert!(base.logging.is_none());
	}

	#[test]
	fn test_merge_fills_missing_section() {
		let mut base = IsiConfigLayer::default();
		base.merge(IsiConfigLayer {
			vault: Some(VaultConfigLayer {
				file: Some(PathBuf::from("/srv/vault.yml")),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(
			base.vault.unwrap().file,
			Some(PathBuf::from("/srv/vault.yml"))
		);
	}

	#[test]
	fn test_merge_is_field_wise() {
		let mut base: IsiConfigLayer = toml::from_str(
			r#"
[automation]
templates_dir = "/opt/isi/Templates"
output_dir = "/opt/isi/playbooks"
"#,
		)
		.unwrap();
		let overlay: IsiConfigLayer = toml::from_str(
			r#"
[automation]
output_dir = "/tmp/playbooks"
"#,
		)
		.unwrap();
		base.merge(overlay);

		let automation = base.automation.unwrap();
		assert_eq!(
			automation.templates_dir,
			Some(PathBuf::from("/opt/isi/Templates"))
		);
		assert_eq!(automation.output_dir, Some(PathBuf::from("/tmp/playbooks")));
	}
}
