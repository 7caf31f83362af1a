// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod automation;
mod logging;
mod vault;

pub use automation::{
	AutomationConfig, AutomationConfigLayer, DEFAULT_ENGINE_PROGRAM, DEFAULT_OUTPUT_DIR,
	DEFAULT_TEMPLATES_DIR,
};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use vault::{VaultConfig, VaultConfigLayer, DEFAULT_VAULT_FILE};
