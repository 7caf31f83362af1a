// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `isi` - manage PowerScale cluster credentials and run playbooks against
//! the selected cluster.

mod automation;
mod clusters;
mod vars;
mod vault;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use isi_config::{load_config, CliOverrides, IsiConfig, LogFormat, LoggingConfig};
use isi_vault::ClusterVault;

#[derive(Parser, Debug)]
#[command(name = "isi", version, about, long_about = None)]
struct Cli {
	/// Path to configuration file (replaces the system and user files)
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Vault file (overrides VAULT_FILE)
	#[arg(long, global = true)]
	vault_file: Option<PathBuf>,

	/// Template directory (overrides TEMPLATES_DIR)
	#[arg(long, global = true)]
	templates_dir: Option<PathBuf>,

	/// Rendered playbook directory (overrides PLAYBOOKS_DIR)
	#[arg(long, global = true)]
	playbooks_dir: Option<PathBuf>,

	/// Verbose engine runs and rendered playbook logging
	#[arg(long, global = true)]
	debug: bool,

	/// Log filter, e.g. `info` or `isi_vault=debug`
	#[arg(short, long, global = true)]
	log_level: Option<String>,

	/// Log output format: pretty, compact or json
	#[arg(long, global = true)]
	log_format: Option<LogFormat>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Manage cluster credentials in the vault
	Clusters {
		#[command(subcommand)]
		command: ClustersCommand,
	},
	/// Render a template and run it against a cluster
	Run(TemplateArgs),
	/// Render a template without running it
	Render(TemplateArgs),
	/// Convert or inspect vault files
	Vault {
		#[command(subcommand)]
		command: VaultCommand,
	},
}

#[derive(Subcommand, Debug)]
enum ClustersCommand {
	/// List clusters (passwords are never shown)
	List {
		/// Output as JSON
		#[arg(long)]
		json: bool,
	},
	/// Add or replace a cluster
	Add {
		name: String,
		/// Host name or URL; https:// is assumed when no scheme is given
		#[arg(long)]
		host: String,
		#[arg(long, default_value_t = isi_vault::DEFAULT_PORT)]
		port: u16,
		#[arg(long)]
		username: String,
		/// Verify the cluster's TLS certificate
		#[arg(long)]
		verify_ssl: bool,
		/// Environment variable holding the password (VAR_FILE also works)
		#[arg(long, default_value = "ISI_CLUSTER_PASSWORD")]
		password_env: String,
	},
	/// Remove a cluster
	Remove { name: String },
}

#[derive(Args, Debug)]
struct TemplateArgs {
	/// Template file name, e.g. smb_create.yml.j2
	template: String,
	/// Cluster to use instead of the first one in the vault
	#[arg(long)]
	cluster: Option<String>,
	/// Template variable (repeatable: -e KEY=VALUE)
	#[arg(short = 'e', long = "var", value_name = "KEY=VALUE")]
	vars: Vec<String>,
	/// Template variables as a JSON object
	#[arg(long)]
	vars_json: Option<String>,
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
	/// Encrypt a plaintext file in place
	Encrypt { file: PathBuf },
	/// Decrypt a vault file in place
	Decrypt { file: PathBuf },
	/// Print the plaintext of a file
	View { file: PathBuf },
}

impl From<&Cli> for CliOverrides {
	fn from(cli: &Cli) -> Self {
		Self {
			vault_file: cli.vault_file.clone(),
			templates_dir: cli.templates_dir.clone(),
			output_dir: cli.playbooks_dir.clone(),
			debug: cli.debug.then_some(true),
			log_level: cli.log_level.clone(),
			log_format: cli.log_format,
		}
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&logging.level))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	// stdout carries command output; logs go to stderr.
	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

async fn open_vault(config: &IsiConfig) -> Result<ClusterVault> {
	ClusterVault::open(&config.vault.file, config.vault.password.clone())
		.await
		.with_context(|| format!("failed to open vault {}", config.vault.file.display()))
}

/// Run one command. `Ok(false)` means the command ran but reported failure.
async fn dispatch(command: Command, config: &IsiConfig) -> Result<bool> {
	match command {
		Command::Clusters { command } => {
			let mut vault = open_vault(config).await?;
			match command {
				ClustersCommand::List { json } => clusters::list(&vault, json)?,
				ClustersCommand::Add {
					name,
					host,
					port,
					username,
					verify_ssl,
					password_env,
				} => {
					clusters::add(
						&mut vault,
						clusters::NewCluster {
							name,
							host,
							port,
							username,
							verify_ssl,
							password_env,
						},
					)
					.await?
				}
				ClustersCommand::Remove { name } => clusters::remove(&mut vault, &name).await?,
			}
			Ok(true)
		}
		Command::Run(args) => {
			let vault = open_vault(config).await?;
			let result = automation::run(config, &vault, &args).await?;
			println!("{}", serde_json::to_string_pretty(&result)?);
			if !result.success {
				info!(returncode = result.returncode, "run failed");
			}
			Ok(result.success)
		}
		Command::Render(args) => {
			let vault = open_vault(config).await?;
			let document = automation::render(config, &vault, &args).await?;
			println!("{}", document.path.display());
			Ok(true)
		}
		Command::Vault { command } => {
			match command {
				VaultCommand::Encrypt { file } => vault::encrypt(config, &file).await?,
				VaultCommand::Decrypt { file } => vault::decrypt(config, &file).await?,
				VaultCommand::View { file } => vault::view(config, &file).await?,
			}
			Ok(true)
		}
	}
}

// No process::exit: secrets are zeroized when the vault drops.
#[tokio::main]
async fn main() -> Result<ExitCode> {
	let cli = Cli::parse();

	let config = load_config(cli.config.clone(), CliOverrides::from(&cli))
		.context("failed to load configuration")?;
	init_tracing(&config.logging);

	debug!(command = ?cli.command, "starting isi");

	if dispatch(cli.command, &config).await? {
		Ok(ExitCode::SUCCESS)
	} else {
		Ok(ExitCode::FAILURE)
	}
}
