// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Template variables from `--vars-json` and repeated `-e KEY=VALUE`.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};

/// Merge `--vars-json` (applied first) with `-e` assignments (applied in
/// order, later wins).
pub fn collect(vars_json: Option<&str>, assignments: &[String]) -> Result<Map<String, Value>> {
	let mut vars = match vars_json {
		Some(text) => match serde_json::from_str::<Value>(text).context("invalid --vars-json")? {
			Value::Object(map) => map,
			other => bail!("--vars-json must be a JSON object, got {other}"),
		},
		None => Map::new(),
	};

	for assignment in assignments {
		let (key, value) = parse_assignment(assignment)?;
		vars.insert(key, value);
	}
	Ok(vars)
}

/// `KEY=VALUE`; the value is JSON when it parses as JSON, else a string.
fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
	let (key, raw) = assignment
		.split_once('=')
		.ok_or_else(|| anyhow!("expected KEY=VALUE, got '{assignment}'"))?;
	let key = key.trim();
	if key.is_empty() {
		bail!("empty variable name in '{assignment}'");
	}
	let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
	Ok((key.to_string(), value))
}
