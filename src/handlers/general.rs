//! Trivial built-in responder for `general_inquiry` (spec §4.9)
//!
//! No handler object is listed for this intent in §2 — the orchestrator
//! routes it straight to this function rather than through a DataAdapter.

use crate::entities::HandlerResult;

const CAPABILITIES: &[&str] = &[
    "verify member eligibility",
    "look up deductible and out-of-pocket accumulators",
    "answer benefit coverage questions",
    "answer questions about an uploaded document",
];

pub fn respond() -> HandlerResult {
    HandlerResult::General {
        message: "I can help with member verification, deductible and accumulator lookups, \
                  and benefit coverage questions. What would you like to know?"
            .to_string(),
        capabilities: CAPABILITIES.iter().map(|c| c.to_string()).collect(),
    }
}
