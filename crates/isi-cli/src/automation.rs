// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::{Context, Result};
use isi_automation::{
	AnsibleRunnerEngine, AutomationDocument, AutomationRunner, ExecutionResult, TemplateRenderer,
};
use isi_config::IsiConfig;
use isi_vault::ClusterVault;

use crate::vars;
use crate::TemplateArgs;

fn runner(config: &IsiConfig, vault: &ClusterVault, cluster: Option<&str>) -> Result<AutomationRunner> {
	let automation = &config.automation;
	let renderer = TemplateRenderer::new(&automation.templates_dir, &automation.output_dir);
	let engine = Arc::new(AnsibleRunnerEngine::new(&automation.engine_program));

	let runner = match cluster {
		Some(name) => AutomationRunner::for_cluster(vault, name, renderer, engine)?,
		None => AutomationRunner::for_selected(vault, renderer, engine)?,
	};
	Ok(runner.with_debug(automation.debug))
}

pub async fn run(
	config: &IsiConfig,
	vault: &ClusterVault,
	args: &TemplateArgs,
) -> Result<ExecutionResult> {
	let variables = vars::collect(args.vars_json.as_deref(), &args.vars)?;
	let runner = runner(config, vault, args.cluster.as_deref())?;
	runner
		.execute(&args.template, &variables)
		.await
		.with_context(|| format!("failed to run {}", args.template))
}

pub async fn render(
	config: &IsiConfig,
	vault: &ClusterVault,
	args: &TemplateArgs,
) -> Result<AutomationDocument> {
	let variables = vars::collect(args.vars_json.as_deref(), &args.vars)?;
	let runner = runner(config, vault, args.cluster.as_deref())?;
	runner
		.render(&args.template, &variables)
		.await
		.with_context(|| format!("failed to render {}", args.template))
}
