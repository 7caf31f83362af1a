// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AutomationError>;

#[derive(Debug, Error)]
pub enum AutomationError {
	#[error("template not found: {name}")]
	TemplateNotFound { name: String },

	#[error("failed to render template {name}: {source}")]
	Render {
		name: String,
		#[source]
		source: minijinja::Error,
	},

	#[error("rendered {name} contains a vault password; refusing to write it")]
	SecretInDocument { name: String },

	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to start {program}: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("no cluster selected")]
	NoClusterSelected,

	#[error("no cluster named '{name}'")]
	ClusterNotFound { name: String },
}
