//! Tool result capture (C8)
//!
//! Per-invocation record of each tool step's structured output. The teacher
//! works around an LLM-driver that narrates instead of returning structured
//! tool results by reaching for module-level mutable state (see `agent/react.rs`'s
//! `ReActStep` accumulation, which is per-agent-instance but still long-lived
//! across calls in places). Section 9's "Hidden global mutable cache" note is
//! explicit that this is a correctness bug under a request-concurrent server,
//! so this capture is an owned value constructed fresh per request and
//! dropped at the end of `Orchestrator::process` — never a `lazy_static`/
//! global map keyed by nothing.

use serde_json::Value;
use std::collections::HashMap;

pub const STEP_ANALYZE_QUERY: &str = "analyze_query";
pub const STEP_ROUTE_TO_AGENT: &str = "route_to_agent";
pub const STEP_FORMAT_RESPONSE: &str = "format_response";

#[derive(Debug, Default)]
pub struct ToolResultCapture {
    steps: HashMap<String, Value>,
}

impl ToolResultCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, step_name: impl Into<String>, value: Value) {
        self.steps.insert(step_name.into(), value);
    }

    pub fn get(&self, step_name: &str) -> Option<&Value> {
        self.steps.get(step_name)
    }

    pub fn contains(&self, step_name: &str) -> bool {
        self.steps.contains_key(step_name)
    }

    pub fn get_all(&self) -> &HashMap<String, Value> {
        &self.steps
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}
