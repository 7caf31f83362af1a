// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Render-then-run pipeline for one cluster.

use std::sync::Arc;

use isi_vault::ClusterVault;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::connection::ClusterConnection;
use crate::engine::{EngineOutcome, EngineRequest, ExecutionEngine};
use crate::error::{AutomationError, Result};
use crate::event::step_results;
use crate::renderer::{AutomationDocument, TemplateRenderer};
use crate::result::{ExecutionResult, ExecutionStatus};

/// Renders playbooks for one cluster and runs them through an engine.
///
/// The rendered file only carries credential placeholders; the real values
/// travel to the engine through the request's side channel.
pub struct AutomationRunner {
	connection: ClusterConnection,
	renderer: TemplateRenderer,
	engine: Arc<dyn ExecutionEngine>,
	debug: bool,
}

impl AutomationRunner {
	pub fn new(
		connection: ClusterConnection,
		renderer: TemplateRenderer,
		engine: Arc<dyn ExecutionEngine>,
	) -> Self {
		Self {
			connection,
			renderer,
			engine,
			debug: false,
		}
	}

	/// Build a runner for the vault's selected cluster.
	///
	/// Rendering refuses any document that contains one of the vault's
	/// passwords, not only the selected cluster's.
	pub fn for_selected(
		vault: &ClusterVault,
		renderer: TemplateRenderer,
		engine: Arc<dyn ExecutionEngine>,
	) -> Result<Self> {
		let credentials = vault
			.selected_credentials()
			.ok_or(AutomationError::NoClusterSelected)?;
		let renderer = renderer.with_guarded_secrets(vault.passwords());
		Ok(Self::new(credentials.into(), renderer, engine))
	}

	/// Build a runner for the cluster called `name`, guarded like
	/// [`AutomationRunner::for_selected`].
	pub fn for_cluster(
		vault: &ClusterVault,
		name: &str,
		renderer: TemplateRenderer,
		engine: Arc<dyn ExecutionEngine>,
	) -> Result<Self> {
		let credentials = vault
			.credentials(name)
			.ok_or_else(|| AutomationError::ClusterNotFound {
				name: name.to_string(),
			})?;
		let renderer = renderer.with_guarded_secrets(vault.passwords());
		Ok(Self::new(credentials.into(), renderer, engine))
	}

	/// Run the engine verbosely.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self.renderer = self.renderer.with_debug(debug);
		self
	}

	/// Render only.
	pub async fn render(
		&self,
		template_name: &str,
		variables: &Map<String, Value>,
	) -> Result<AutomationDocument> {
		self.renderer
			.render(&self.connection, template_name, variables)
			.await
	}

	/// Render `template_name` and run it.
	///
	/// Render and spawn failures are errors. A run that starts and then fails
	/// is a `Failed` result; the rendered artifact stays on disk either way.
	#[instrument(skip(self, variables), fields(cluster = %self.connection.name))]
	pub async fn execute(
		&self,
		template_name: &str,
		variables: &Map<String, Value>,
	) -> Result<ExecutionResult> {
		let document = self.render(template_name, variables).await?;

		let request = EngineRequest {
			work_dir: self.renderer.output_dir().to_path_buf(),
			document: document.file_name(),
			side_channel: self.connection.side_channel(),
			verbose: self.debug,
			ident: uuid::Uuid::new_v4().to_string(),
		};
		let outcome = self.engine.run(request).await?;

		let result = build_result(&document, outcome);
		if result.success {
			info!(
				artifact = %result.artifact_path.display(),
				steps = result.step_results.len(),
				"automation run successful"
			);
		} else {
			warn!(
				artifact = %result.artifact_path.display(),
				returncode = result.returncode,
				"automation run failed"
			);
		}
		Ok(result)
	}
}

fn build_result(document: &AutomationDocument, outcome: EngineOutcome) -> ExecutionResult {
	let success = outcome.status == ExecutionStatus::Successful;
	let step_results = step_results(&outcome.events);

	let stderr = (!success).then(|| {
		if !outcome.stderr.trim().is_empty() {
			return outcome.stderr.clone();
		}
		let failures: Vec<&str> = outcome
			.events
			.iter()
			.filter(|e| e.is_failure())
			.filter_map(|e| e.stdout.as_deref())
			.filter(|s| !s.is_empty())
			.collect();
		if failures.is_empty() {
			format!("engine exited with return code {}", outcome.returncode)
		} else {
			failures.join("\n")
		}
	});

	ExecutionResult {
		success,
		status: outcome.status,
		returncode: outcome.returncode,
		artifact_path: document.path.clone(),
		stdout: outcome.stdout,
		stderr,
		step_results,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::{EngineEvent, EventData, EVENT_FAILED};
	use std::path::PathBuf;

	fn document() -> AutomationDocument {
		AutomationDocument {
			template_name: "t.yml.j2".to_string(),
			path: PathBuf::from("/out/t_x.yml"),
			content: String::new(),
		}
	}

	fn outcome(rc: i32, stderr: &str, events: Vec<EngineEvent>) -> EngineOutcome {
		EngineOutcome {
			returncode: rc,
			status: ExecutionStatus::from_returncode(rc),
			stdout: "out".to_string(),
			stderr: stderr.to_string(),
			events,
		}
	}

	#[test]
	fn success_has_no_stderr() {
		let result = build_result(&document(), outcome(0, "noise", vec![]));
		assert!(result.success);
		assert!(result.stderr.is_none());
		assert_eq!(result.stdout, "out");
	}

	#[test]
	fn failure_prefers_process_stderr() {
		let result = build_result(&document(), outcome(2, "fatal: boom\n", vec![]));
		assert!(!result.success);
		assert_eq!(result.status, ExecutionStatus::Failed);
		assert_eq!(result.stderr.as_deref(), Some("fatal: boom\n"));
		assert_eq!(result.artifact_path, PathBuf::from("/out/t_x.yml"));
	}

	#[test]
	fn failure_falls_back_to_failed_events_then_returncode() {
		let failed = EngineEvent {
			event: EVENT_FAILED.to_string(),
			event_data: EventData::default(),
			stdout: Some("fatal: [localhost]: FAILED!".to_string()),
		};
		let result = build_result(&document(), outcome(2, "", vec![failed]));
		assert_eq!(result.stderr.as_deref(), Some("fatal: [localhost]: FAILED!"));

		let result = build_result(&document(), outcome(4, "  ", vec![]));
		assert_eq!(
			result.stderr.as_deref(),
			Some("engine exited with return code 4")
		);
	}
}
