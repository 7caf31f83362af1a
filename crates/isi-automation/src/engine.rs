// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The automation engine seam and its `ansible-runner` implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::connection::SideChannel;
use crate::error::{AutomationError, Result};
use crate::event::{parse_event_stream, EngineEvent};
use crate::result::ExecutionStatus;

pub const DEFAULT_PROGRAM: &str = "ansible-runner";

/// One engine invocation.
#[derive(Debug, Clone)]
pub struct EngineRequest {
	/// Private data directory the engine runs in.
	pub work_dir: PathBuf,
	/// Playbook file name relative to `work_dir`.
	pub document: String,
	pub side_channel: SideChannel,
	pub verbose: bool,
	/// Artifact identifier for this run.
	pub ident: String,
}

/// What the engine reported once it exited.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
	pub returncode: i32,
	pub status: ExecutionStatus,
	pub stdout: String,
	pub stderr: String,
	pub events: Vec<EngineEvent>,
}

/// Runs a rendered playbook. Implementations must not write the side channel
/// into `work_dir` themselves.
///
/// The side channel reaches the engine process as plain text on its command
/// line, so it is visible to other local users through the process table
/// while the run lasts. Anything the engine records about its own
/// invocation has to be kept out of `work_dir` and removed afterwards.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
	/// Run to completion. Only failure to start the engine is an error; a
	/// failed run is reported through the outcome.
	async fn run(&self, request: EngineRequest) -> Result<EngineOutcome>;
}

/// Invokes the `ansible-runner` CLI with JSON event output.
///
/// `ansible-runner` copies its full command line, extra variables included,
/// into `<artifact dir>/<ident>/command`. Each run therefore gets a private
/// temporary artifact directory that is deleted once the process exits.
#[derive(Debug, Clone)]
pub struct AnsibleRunnerEngine {
	program: String,
}

impl AnsibleRunnerEngine {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
		}
	}

	fn command(&self, request: &EngineRequest, artifact_dir: &Path) -> Command {
		let extra_vars = request.side_channel.to_json();
		let mut cmd = Command::new(&self.program);
		cmd.arg("run")
			.arg(&request.work_dir)
			.arg("--playbook")
			.arg(&request.document)
			.arg("--ident")
			.arg(&request.ident)
			.arg("--artifact-dir")
			.arg(artifact_dir)
			.arg("--json")
			.arg("--cmdline")
			.arg(format!("-e {}", shell_quote(&extra_vars)));
		if request.verbose {
			cmd.arg("-v");
		}
		cmd.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);
		cmd
	}
}

impl Default for AnsibleRunnerEngine {
	fn default() -> Self {
		Self::new(DEFAULT_PROGRAM)
	}
}

#[async_trait]
impl ExecutionEngine for AnsibleRunnerEngine {
	async fn run(&self, request: EngineRequest) -> Result<EngineOutcome> {
		debug!(
			program = %self.program,
			work_dir = %request.work_dir.display(),
			document = %request.document,
			ident = %request.ident,
			"starting engine"
		);

		let artifacts = tempfile::Builder::new()
			.prefix("isi-runner-")
			.tempdir()
			.map_err(|source| AutomationError::Io {
				path: std::env::temp_dir(),
				source,
			})?;

		let output = self
			.command(&request, artifacts.path())
			.output()
			.await
			.map_err(|source| {
				warn!(program = %self.program, error = %source, "failed to start engine");
				AutomationError::Spawn {
					program: self.program.clone(),
					source,
				}
			})?;

		// Killed by a signal: no exit code.
		let returncode = output.status.code().unwrap_or(-1);
		let raw_stdout = String::from_utf8_lossy(&output.stdout);
		let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
		let (events, stdout) = parse_event_stream(&raw_stdout);

		trace!(events = events.len(), "parsed engine event stream");
		debug!(returncode, "engine exited");

		let artifact_path = artifacts.path().to_path_buf();
		if let Err(e) = artifacts.close() {
			warn!(path = %artifact_path.display(), error = %e, "failed to remove engine artifacts");
		}

		Ok(EngineOutcome {
			returncode,
			status: ExecutionStatus::from_returncode(returncode),
			stdout,
			stderr,
			events,
		})
	}
}

/// Single-quote for the shell-style splitting `ansible-runner` applies to
/// `--cmdline`.
fn shell_quote(value: &str) -> String {
	format!("'{}'", value.replace('\'', r#"'"'"'"#))
}
