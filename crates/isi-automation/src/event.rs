// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job events emitted by the engine on its JSON event stream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EVENT_OK: &str = "runner_on_ok";
pub const EVENT_FAILED: &str = "runner_on_failed";
pub const EVENT_UNREACHABLE: &str = "runner_on_unreachable";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub task: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub res: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
	pub event: String,
	#[serde(default)]
	pub event_data: EventData,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stdout: Option<String>,
}

impl EngineEvent {
	pub fn is_failure(&self) -> bool {
		self.event == EVENT_FAILED || self.event == EVENT_UNREACHABLE
	}
}

/// Split engine stdout into structured events and display text.
///
/// Lines that parse as an event contribute their `stdout` field to the text;
/// any other line is kept as is.
pub fn parse_event_stream(output: &str) -> (Vec<EngineEvent>, String) {
	let mut events = Vec::new();
	let mut text = String::new();

	for line in output.lines() {
		let trimmed = line.trim();
		if trimmed.starts_with('{') {
			if let Ok(event) = serde_json::from_str::<EngineEvent>(trimmed) {
				if let Some(stdout) = event.stdout.as_deref().filter(|s| !s.is_empty()) {
					text.push_str(stdout);
					text.push('\n');
				}
				events.push(event);
				continue;
			}
		}
		text.push_str(line);
		text.push('\n');
	}

	(events, text)
}

/// Results of successful steps keyed by task name.
///
/// Steps without a name or with an empty payload are skipped; a later step
/// with the same name replaces an earlier one.
pub fn step_results(events: &[EngineEvent]) -> Map<String, Value> {
	let mut results = Map::new();
	for event in events.iter().filter(|e| e.event == EVENT_OK) {
		let Some(task) = event.event_data.task.as_deref().filter(|t| !t.is_empty()) else {
			continue;
		};
		let Some(res) = event.event_data.res.as_ref().filter(|r| !is_empty_payload(r)) else {
			continue;
		};
		results.insert(task.to_string(), res.clone());
	}
	results
}

fn is_empty_payload(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::String(s) => s.is_empty(),
		Value::Array(a) => a.is_empty(),
		Value::Object(o) => o.is_empty(),
		Value::Number(_) => false,
	}
}
