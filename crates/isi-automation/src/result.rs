// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
	Successful,
	Failed,
}

impl ExecutionStatus {
	pub fn from_returncode(rc: i32) -> Self {
		if rc == 0 {
			Self::Successful
		} else {
			Self::Failed
		}
	}
}

impl std::fmt::Display for ExecutionStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Successful => f.write_str("successful"),
			Self::Failed => f.write_str("failed"),
		}
	}
}

/// Outcome of one `execute()` call.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
	pub success: bool,
	pub status: ExecutionStatus,
	pub returncode: i32,
	pub artifact_path: PathBuf,
	pub stdout: String,
	/// Present only when the run failed.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stderr: Option<String>,
	pub step_results: Map<String, Value>,
}
