// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use isi_automation::{
	AutomationError, AutomationRunner, EngineEvent, EngineOutcome, EngineRequest, EventData,
	ExecutionEngine, ExecutionStatus, TemplateRenderer,
};
use isi_common_secret::SecretString;
use isi_vault::{ClusterCredentials, ClusterVault};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

const PASSWORD: &str = "Sup3r-S3cret!";

const SMB_TEMPLATE: &str = r#"- hosts: localhost
  tasks:
    - name: Create SMB share
      dellemc.powerscale.smb:
        onefs_host: "{{ onefs_host }}"
        port_no: "{{ port_no }}"
        verify_ssl: {{ verify_ssl }}
        api_user: "{{ api_user }}"
        api_password: "{{ api_password }}"
        share_name: "{{ share_name }}"
        path: "{{ path }}"
        state: present
"#;

/// What the fake engine saw on one call.
#[derive(Debug, Clone)]
struct Seen {
	work_dir: PathBuf,
	document: String,
	document_content: String,
	api_user: String,
	api_password: String,
	verbose: bool,
}

struct ScriptedEngine {
	returncode: i32,
	stderr: String,
	events: Vec<EngineEvent>,
	seen: Mutex<Vec<Seen>>,
}

impl ScriptedEngine {
	fn new(returncode: i32, stderr: &str, events: Vec<EngineEvent>) -> Arc<Self> {
		Arc::new(Self {
			returncode,
			stderr: stderr.to_string(),
			events,
			seen: Mutex::new(Vec::new()),
		})
	}

	fn seen(&self) -> Vec<Seen> {
		self.seen.lock().unwrap().clone()
	}
}

#[async_trait]
impl ExecutionEngine for ScriptedEngine {
	async fn run(&self, request: EngineRequest) -> isi_automation::Result<EngineOutcome> {
		let document_content =
			std::fs::read_to_string(request.work_dir.join(&request.document)).unwrap();
		self.seen.lock().unwrap().push(Seen {
			work_dir: request.work_dir.clone(),
			document: request.document.clone(),
			document_content,
			api_user: request.side_channel.api_user.clone(),
			api_password: request.side_channel.api_password.expose().clone(),
			verbose: request.verbose,
		});
		Ok(EngineOutcome {
			returncode: self.returncode,
			status: ExecutionStatus::from_returncode(self.returncode),
			stdout: "PLAY [localhost]\n".to_string(),
			stderr: self.stderr.clone(),
			events: self.events.clone(),
		})
	}
}

struct Fixture {
	dir: TempDir,
	vault: ClusterVault,
}

impl Fixture {
	async fn new() -> Self {
		let dir = TempDir::new().unwrap();
		let templates = dir.path().join("Templates");
		std::fs::create_dir_all(&templates).unwrap();
		std::fs::write(templates.join("smb_create.yml.j2"), SMB_TEMPLATE).unwrap();

		let vault_path = dir.path().join("vault.yml");
		std::fs::write(&vault_path, "clusters: {}\n").unwrap();
		let mut vault = ClusterVault::open(&vault_path, Some(SecretString::from("vault-pass")))
			.await
			.unwrap();
		vault
			.add_cluster(ClusterCredentials::new(
				"prod",
				"10.0.0.1",
				8080,
				"root",
				SecretString::from(PASSWORD),
				false,
			))
			.await
			.unwrap();

		Self { dir, vault }
	}

	fn playbooks(&self) -> PathBuf {
		self.dir.path().join("playbooks")
	}

	fn renderer(&self) -> TemplateRenderer {
		TemplateRenderer::new(self.dir.path().join("Templates"), self.playbooks())
	}

	fn runner(&self, engine: Arc<ScriptedEngine>) -> AutomationRunner {
		AutomationRunner::for_selected(&self.vault, self.renderer(), engine).unwrap()
	}
}

fn share_vars() -> Map<String, Value> {
	match json!({"share_name": "finance", "path": "/ifs/data/finance"}) {
		Value::Object(map) => map,
		_ => unreachable!(),
	}
}

fn ok_event(task: &str, res: Value) -> EngineEvent {
	EngineEvent {
		event: "runner_on_ok".to_string(),
		event_data: EventData {
			task: Some(task.to_string()),
			res: Some(res),
		},
		stdout: None,
	}
}

#[tokio::test]
async fn successful_run_keeps_password_out_of_the_artifact() {
	let fixture = Fixture::new().await;
	let engine = ScriptedEngine::new(
		0,
		"",
		vec![ok_event("Create SMB share", json!({"changed": true}))],
	);
	let runner = fixture.runner(engine.clone());

	let result = runner
		.execute("smb_create.yml.j2", &share_vars())
		.await
		.unwrap();

	assert!(result.success);
	assert_eq!(result.status, ExecutionStatus::Successful);
	assert_eq!(result.returncode, 0);
	assert!(result.stderr.is_none());
	assert_eq!(result.stdout, "PLAY [localhost]\n");
	assert_eq!(
		result.step_results["Create SMB share"],
		json!({"changed": true})
	);

	let content = std::fs::read_to_string(&result.artifact_path).unwrap();
	assert!(content.contains("share_name: \"finance\""));
	assert!(content.contains("onefs_host: \"10.0.0.1\""));
	assert!(content.contains("api_password: \"{{ api_password }}\""));
	assert!(!content.contains(PASSWORD));

	let seen = engine.seen();
	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].work_dir, fixture.playbooks());
	assert_eq!(
		PathBuf::from(&seen[0].document).file_name(),
		result.artifact_path.file_name()
	);
	assert_eq!(seen[0].document_content, content);
	assert_eq!(seen[0].api_user, "root");
	assert_eq!(seen[0].api_password, PASSWORD);
	assert!(!seen[0].verbose);
}

#[tokio::test]
async fn failed_run_reports_stderr_and_keeps_artifact() {
	let fixture = Fixture::new().await;
	let engine = ScriptedEngine::new(2, "ERROR! connection refused\n", vec![]);
	let runner = fixture.runner(engine);

	let result = runner
		.execute("smb_create.yml.j2", &share_vars())
		.await
		.unwrap();

	assert!(!result.success);
	assert_eq!(result.status, ExecutionStatus::Failed);
	assert_eq!(result.returncode, 2);
	assert!(!result.stderr.as_deref().unwrap_or_default().is_empty());
	assert!(result.artifact_path.exists());
	assert!(result.step_results.is_empty());
}

#[tokio::test]
async fn repeated_runs_write_distinct_artifacts() {
	let fixture = Fixture::new().await;
	let runner = fixture.runner(ScriptedEngine::new(0, "", vec![]));

	let a = runner
		.execute("smb_create.yml.j2", &share_vars())
		.await
		.unwrap();
	let b = runner
		.execute("smb_create.yml.j2", &share_vars())
		.await
		.unwrap();

	assert_ne!(a.artifact_path, b.artifact_path);
	let count = std::fs::read_dir(fixture.playbooks()).unwrap().count();
	assert_eq!(count, 2);
}

#[tokio::test]
async fn debug_flag_reaches_engine() {
	let fixture = Fixture::new().await;
	let engine = ScriptedEngine::new(0, "", vec![]);
	let runner = fixture.runner(engine.clone()).with_debug(true);

	runner
		.execute("smb_create.yml.j2", &share_vars())
		.await
		.unwrap();

	assert!(engine.seen()[0].verbose);
}

#[tokio::test]
async fn render_errors_propagate_without_calling_engine() {
	let fixture = Fixture::new().await;
	let engine = ScriptedEngine::new(0, "", vec![]);
	let runner = fixture.runner(engine.clone());

	let err = runner
		.execute("missing.yml.j2", &Map::new())
		.await
		.unwrap_err();
	assert!(matches!(err, AutomationError::TemplateNotFound { .. }));
	assert!(engine.seen().is_empty());
}

#[tokio::test]
async fn other_cluster_password_never_reaches_a_playbook() {
	let mut fixture = Fixture::new().await;
	fixture
		.vault
		.add_cluster(ClusterCredentials::new(
			"lab",
			"10.0.0.2",
			8080,
			"admin",
			SecretString::from("Lab-Only-Pass"),
			true,
		))
		.await
		.unwrap();
	let engine = ScriptedEngine::new(0, "", vec![]);
	let runner = fixture.runner(engine.clone());

	let mut vars = share_vars();
	vars.insert("path".to_string(), json!("/ifs/Lab-Only-Pass"));
	let err = runner
		.execute("smb_create.yml.j2", &vars)
		.await
		.unwrap_err();

	assert!(matches!(err, AutomationError::SecretInDocument { .. }));
	assert!(engine.seen().is_empty());
	let written = std::fs::read_dir(fixture.playbooks())
		.map(|d| d.count())
		.unwrap_or(0);
	assert_eq!(written, 0);
}

#[tokio::test]
async fn named_cluster_runner() {
	let fixture = Fixture::new().await;
	let engine = ScriptedEngine::new(0, "", vec![]);

	let err = AutomationRunner::for_cluster(&fixture.vault, "nope", fixture.renderer(), engine.clone())
		.err()
		.unwrap();
	assert!(matches!(err, AutomationError::ClusterNotFound { ref name } if name == "nope"));

	let runner =
		AutomationRunner::for_cluster(&fixture.vault, "prod", fixture.renderer(), engine.clone())
			.unwrap();
	runner
		.execute("smb_create.yml.j2", &share_vars())
		.await
		.unwrap();
	assert_eq!(engine.seen()[0].api_password, PASSWORD);
}

#[tokio::test]
async fn empty_vault_has_no_runner() {
	let dir = TempDir::new().unwrap();
	let vault_path = dir.path().join("vault.yml");
	std::fs::write(&vault_path, "").unwrap();
	let vault = ClusterVault::open(&vault_path, None).await.unwrap();

	let renderer = TemplateRenderer::new(dir.path().join("Templates"), dir.path().join("out"));
	let err =
		AutomationRunner::for_selected(&vault, renderer, ScriptedEngine::new(0, "", vec![]))
			.err()
			.unwrap();
	assert!(matches!(err, AutomationError::NoClusterSelected));
}
