// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Template rendering into the playbook audit directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use minijinja::{AutoEscape, Environment, ErrorKind};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use isi_common_secret::SecretString;

use crate::connection::ClusterConnection;
use crate::error::{AutomationError, Result};

const TEMPLATE_SUFFIX: &str = ".j2";
const DEFAULT_EXTENSION: &str = "yml";
const HOST_PREFIX_LEN: usize = 8;
const RUN_ID_LEN: usize = 8;
const MAX_NAME_ATTEMPTS: usize = 8;

/// A rendered playbook written to disk. Never deleted by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationDocument {
	pub template_name: String,
	pub path: PathBuf,
	pub content: String,
}

impl AutomationDocument {
	/// File name relative to the output directory.
	pub fn file_name(&self) -> String {
		self.path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_default()
	}
}

/// Renders named Jinja2 templates with connection parameters merged in.
pub struct TemplateRenderer {
	env: Environment<'static>,
	templates_dir: PathBuf,
	output_dir: PathBuf,
	guarded: Vec<SecretString>,
	debug: bool,
}

impl std::fmt::Debug for TemplateRenderer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TemplateRenderer")
			.field("templates_dir", &self.templates_dir)
			.field("output_dir", &self.output_dir)
			.field("guarded", &self.guarded.len())
			.field("debug", &self.debug)
			.finish()
	}
}

impl TemplateRenderer {
	pub fn new(templates_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
		let templates_dir = templates_dir.into();
		let mut env = Environment::new();
		env.set_loader(minijinja::path_loader(templates_dir.clone()));
		env.set_keep_trailing_newline(true);
		// Playbooks are YAML; the default callback would JSON-escape .yml.
		env.set_auto_escape_callback(|_| AutoEscape::None);

		Self {
			env,
			templates_dir,
			output_dir: output_dir.into(),
			guarded: Vec::new(),
			debug: false,
		}
	}

	/// Log every rendered document body at debug level.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Secrets besides the active connection's password that must never
	/// reach a rendered document, e.g. the other clusters in the vault.
	pub fn with_guarded_secrets(mut self, secrets: impl IntoIterator<Item = SecretString>) -> Self {
		self.guarded.extend(secrets);
		self
	}

	pub fn output_dir(&self) -> &Path {
		&self.output_dir
	}

	/// Render `template_name` and write it under the output directory.
	///
	/// Caller variables override connection parameters of the same name.
	pub async fn render(
		&self,
		connection: &ClusterConnection,
		template_name: &str,
		variables: &Map<String, Value>,
	) -> Result<AutomationDocument> {
		let mut params = connection.template_parameters();
		for (key, value) in variables {
			params.insert(key.clone(), value.clone());
		}

		let content = self.render_content(template_name, &Value::Object(params))?;

		let leaked = std::iter::once(&connection.password)
			.chain(&self.guarded)
			.any(|secret| {
				let value = secret.expose();
				!value.is_empty() && content.contains(value.as_str())
			});
		if leaked {
			warn!(
				template = template_name,
				cluster = %connection.name,
				"rendered document contains a vault password"
			);
			return Err(AutomationError::SecretInDocument {
				name: template_name.to_string(),
			});
		}

		let path = self.write_artifact(template_name, &content).await?;

		info!(template = template_name, path = %path.display(), "rendered playbook");
		if self.debug {
			debug!(path = %path.display(), content = %content, "rendered playbook content");
		}

		Ok(AutomationDocument {
			template_name: template_name.to_string(),
			path,
			content,
		})
	}

	fn render_content(&self, template_name: &str, ctx: &Value) -> Result<String> {
		let template = self.env.get_template(template_name).map_err(|e| {
			if e.kind() == ErrorKind::TemplateNotFound {
				AutomationError::TemplateNotFound {
					name: template_name.to_string(),
				}
			} else {
				AutomationError::Render {
					name: template_name.to_string(),
					source: e,
				}
			}
		})?;
		template.render(ctx).map_err(|source| AutomationError::Render {
			name: template_name.to_string(),
			source,
		})
	}

	async fn write_artifact(&self, template_name: &str, content: &str) -> Result<PathBuf> {
		let io_err = |path: &Path| {
			let path = path.to_path_buf();
			move |source: std::io::Error| AutomationError::Io { path, source }
		};

		tokio::fs::create_dir_all(&self.output_dir)
			.await
			.map_err(io_err(&self.output_dir))?;

		let host = host_prefix();
		let mut attempt = 0;
		loop {
			attempt += 1;
			let name = artifact_file_name(template_name, Local::now(), &host, &run_id());
			let path = self.output_dir.join(name);

			let opened = tokio::fs::OpenOptions::new()
				.write(true)
				.create_new(true)
				.open(&path)
				.await;
			let mut file = match opened {
				Ok(file) => file,
				Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists
					&& attempt < MAX_NAME_ATTEMPTS =>
				{
					debug!(path = %path.display(), "artifact name taken, retrying");
					continue;
				}
				Err(e) => return Err(io_err(&path)(e)),
			};

			file.write_all(content.as_bytes())
				.await
				.map_err(io_err(&path))?;
			file.flush().await.map_err(io_err(&path))?;
			return Ok(path);
		}
	}
}

/// `{base}_{YYYYMMDD_HHMMSS}_{host}_{run_id}.{ext}` for a template name.
///
/// `smb_create.yml.j2` gives base `smb_create` and extension `yml`; a name
/// without an inner extension falls back to `yml`.
pub fn artifact_file_name(
	template_name: &str,
	now: DateTime<Local>,
	host: &str,
	run_id: &str,
) -> String {
	let file = Path::new(template_name)
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| template_name.to_string());
	let stem = file.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(&file);
	let (base, ext) = match stem.rsplit_once('.') {
		Some((base, ext)) if !base.is_empty() && !ext.is_empty() => (base, ext),
		_ => (stem, DEFAULT_EXTENSION),
	};
	format!(
		"{base}_{}_{host}_{run_id}.{ext}",
		now.format("%Y%m%d_%H%M%S")
	)
}

fn host_prefix() -> String {
	let name = hostname::get()
		.map(|h| h.to_string_lossy().into_owned())
		.unwrap_or_else(|_| "unknown".to_string());
	name.chars().take(HOST_PREFIX_LEN).collect()
}

fn run_id() -> String {
	let id = uuid::Uuid::new_v4().simple().to_string();
	id[..RUN_ID_LEN].to_string()
}
