// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Playbook automation against PowerScale clusters.
//!
//! A [`TemplateRenderer`] turns a Jinja2 template plus caller variables into a
//! playbook under the audit directory. Credentials enter the template only
//! as `{{ api_user }}` / `{{ api_password }}` placeholders; the
//! [`AutomationRunner`] hands the real values to the [`ExecutionEngine`] at
//! run time and collects an [`ExecutionResult`].

pub mod connection;
pub mod engine;
pub mod error;
pub mod event;
pub mod renderer;
pub mod result;
pub mod runner;

pub use connection::{ClusterConnection, SideChannel, API_PASSWORD_KEY, API_USER_KEY};
pub use engine::{AnsibleRunnerEngine, EngineOutcome, EngineRequest, ExecutionEngine};
pub use error::{AutomationError, Result};
pub use event::{EngineEvent, EventData};
pub use renderer::{artifact_file_name, AutomationDocument, TemplateRenderer};
pub use result::{ExecutionResult, ExecutionStatus};
pub use runner::AutomationRunner;
