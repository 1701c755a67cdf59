//! IntentClassifier (C1)
//!
//! Pattern-matches free text into the closed intent set and extracts
//! entities. Pure and synchronous — no I/O, never fails (falls back to
//! `general_inquiry`). Grounded on the teacher's `orchestrator/router.rs`
//! `Router`: a struct of `&self` keyword-matching helper methods with a
//! deterministic fallback, generalized here to also score and extract
//! entities instead of delegating ambiguous cases to an LLM call.
//!
//! Resolved open question (spec §9): when a query names both a service and
//! an explicit document reference ("uploaded", "document", "pdf"),
//! `local_rag` wins over `benefit_coverage_rag` — an explicit document
//! reference is a more specific signal than a bare service mention.

use crate::entities::{Entities, Intent, IntentResult, QueryType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static MEMBER_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][0-9]{3,}").unwrap());
static DOB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

const STATUS_KW: &[&str] = &["active", "eligible", "valid", "verify"];
const USAGE_KW: &[&str] = &["how many", "count", "used", "visits", "remaining"];
const FINANCIAL_KW: &[&str] = &["deductible", "oop", "out-of-pocket", "copay"];
const COVERAGE_KW: &[&str] = &["covered", "coverage", "includes", "benefits"];
const DOC_KW: &[&str] = &["uploaded", "document", "pdf"];
const GREETING_KW: &[&str] = &["hello", "hi ", "hey", "help", "good morning", "good afternoon"];

/// (surface form, canonical name), longest surface form wins on overlap.
const SERVICE_VOCAB: &[(&str, &str)] = &[
    ("massage therapy", "Massage Therapy"),
    ("massage", "Massage Therapy"),
    ("chiropractic", "Chiropractic"),
    ("chiropractor", "Chiropractic"),
    ("acupuncture", "Acupuncture"),
    ("physical therapy", "Physical Therapy"),
    ("pt", "Physical Therapy"),
];

fn count_hits(q: &str, keywords: &[&str]) -> u32 {
    keywords.iter().filter(|k| q.contains(*k)).count() as u32
}

fn extract_member_id(prompt: &str) -> Option<String> {
    MEMBER_ID_RE
        .find(prompt)
        .map(|m| m.as_str().to_uppercase())
}

fn extract_dob(prompt: &str) -> Option<String> {
    DOB_RE.find(prompt).map(|m| m.as_str().to_string())
}

fn extract_service(q_lower: &str) -> Option<String> {
    let mut best: Option<(&str, &str)> = None;
    for (surface, canonical) in SERVICE_VOCAB {
        let hit = if surface.len() <= 2 {
            // "pt" needs a word boundary to avoid matching inside other words.
            Regex::new(&format!(r"\b{}\b", regex::escape(surface)))
                .map(|re| re.is_match(q_lower))
                .unwrap_or(false)
        } else {
            q_lower.contains(surface)
        };
        if hit {
            match best {
                Some((best_surface, _)) if best_surface.len() >= surface.len() => {}
                _ => best = Some((surface, canonical)),
            }
        }
    }
    best.map(|(_, canonical)| canonical.to_string())
}

fn extract_query_type(q: &str, financial: u32, usage: u32, coverage: u32, status: u32) -> QueryType {
    if financial > 0 {
        QueryType::Financial
    } else if usage > 0 {
        QueryType::UsageCount
    } else if coverage > 0 {
        QueryType::Coverage
    } else if status > 0 {
        QueryType::Status
    } else {
        let _ = q;
        QueryType::General
    }
}

/// Priority used only to break exact score ties deterministically.
const TIE_BREAK_ORDER: [Intent; 6] = [
    Intent::DeductibleOop,
    Intent::BenefitAccumulator,
    Intent::MemberVerification,
    Intent::LocalRag,
    Intent::BenefitCoverageRag,
    Intent::GeneralInquiry,
];

pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a query. Pure function of the text (context is accepted for
    /// forward compatibility but unused by the pattern-matching algorithm).
    pub fn classify(&self, prompt: &str) -> IntentResult {
        let q_lower = prompt.to_lowercase();

        let member_id = extract_member_id(prompt);
        let dob = extract_dob(prompt);
        let service = extract_service(&q_lower);

        let status_hits = count_hits(&q_lower, STATUS_KW);
        let usage_hits = count_hits(&q_lower, USAGE_KW);
        let financial_hits = count_hits(&q_lower, FINANCIAL_KW);
        let coverage_hits = count_hits(&q_lower, COVERAGE_KW);
        let doc_hits = count_hits(&q_lower, DOC_KW);
        let greeting_hits = count_hits(&q_lower, GREETING_KW);

        let query_type = extract_query_type(&q_lower, financial_hits, usage_hits, coverage_hits, status_hits);

        let entities = Entities {
            member_id: member_id.clone(),
            dob,
            service: service.clone(),
            name: None,
            query_type: Some(query_type),
        };

        let has_member_id = member_id.is_some();
        let usage_dominant = usage_hits > 0;

        let mut scores: HashMap<Intent, u32> = HashMap::new();

        let member_verification_score = if has_member_id && status_hits > 0 && !usage_dominant {
            status_hits
        } else {
            0
        };
        scores.insert(Intent::MemberVerification, member_verification_score);

        let deductible_score = if financial_hits > 0 && has_member_id {
            financial_hits
        } else {
            0
        };
        scores.insert(Intent::DeductibleOop, deductible_score);

        let accumulator_score = if usage_hits > 0 && (service.is_some() || has_member_id) {
            usage_hits
        } else {
            0
        };
        scores.insert(Intent::BenefitAccumulator, accumulator_score);

        // local_rag takes the document signal before benefit_coverage_rag gets
        // a chance at it (resolved open question above).
        let local_rag_score = if doc_hits > 0 && !has_member_id { doc_hits } else { 0 };
        scores.insert(Intent::LocalRag, local_rag_score);

        let coverage_score = if coverage_hits > 0 && !has_member_id && !usage_dominant && local_rag_score == 0 {
            coverage_hits
        } else {
            0
        };
        scores.insert(Intent::BenefitCoverageRag, coverage_score);

        let general_score = if greeting_hits > 0 { greeting_hits } else { 0 };
        scores.insert(Intent::GeneralInquiry, general_score);

        let top_score = *scores.values().max().unwrap_or(&0);

        let (intent, reasoning) = if top_score == 0 {
            (
                Intent::GeneralInquiry,
                "No intent pattern matched; defaulting to general inquiry".to_string(),
            )
        } else {
            let chosen = TIE_BREAK_ORDER
                .iter()
                .find(|i| scores.get(*i).copied().unwrap_or(0) == top_score)
                .copied()
                .unwrap_or(Intent::GeneralInquiry);
            (chosen, format!("Matched {} pattern hit(s) for {}", top_score, chosen))
        };

        let entity_count = entities.count() as f32;
        let mut confidence = 0.3 + 0.15 * top_score as f32 + 0.1 * entity_count;
        if top_score >= 1 && entities.count() > 0 {
            confidence = confidence.max(0.5);
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let fallback_intent = Self::fallback_intent(intent, &scores, has_member_id);

        IntentResult {
            intent,
            agent_name: intent.agent_name().to_string(),
            confidence,
            reasoning,
            entities,
            pattern_matches: scores,
            fallback_intent,
        }
    }

    fn fallback_intent(
        chosen: Intent,
        scores: &HashMap<Intent, u32>,
        has_member_id: bool,
    ) -> Intent {
        let mut ranked: Vec<(Intent, u32)> = scores
            .iter()
            .filter(|(i, _)| **i != chosen)
            .map(|(i, s)| (*i, *s))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        if let Some((intent, score)) = ranked.first() {
            if *score > 0 {
                return *intent;
            }
        }

        if has_member_id && chosen != Intent::MemberVerification {
            Intent::MemberVerification
        } else {
            Intent::GeneralInquiry
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_verification_scenario() {
        let r = IntentClassifier::new().classify("Is member M1001 active?");
        assert_eq!(r.intent, Intent::MemberVerification);
        assert_eq!(r.entities.member_id.as_deref(), Some("M1001"));
        assert!(r.confidence >= 0.5);
    }

    #[test]
    fn deductible_scenario() {
        let r = IntentClassifier::new().classify("What is the deductible for member M1001?");
        assert_eq!(r.intent, Intent::DeductibleOop);
        assert_eq!(r.entities.member_id.as_deref(), Some("M1001"));
    }

    #[test]
    fn accumulator_scenario() {
        let r = IntentClassifier::new()
            .classify("How many massage therapy visits has member M1001 used?");
        assert_eq!(r.intent, Intent::BenefitAccumulator);
        assert_eq!(r.entities.service.as_deref(), Some("Massage Therapy"));
    }

    #[test]
    fn coverage_rag_scenario() {
        let r = IntentClassifier::new().classify("Is acupuncture covered?");
        assert_eq!(r.intent, Intent::BenefitCoverageRag);
        assert!(r.entities.member_id.is_none());
    }

    #[test]
    fn general_inquiry_scenario() {
        let r = IntentClassifier::new().classify("Hello");
        assert_eq!(r.intent, Intent::GeneralInquiry);
        assert!((0.0..=1.0).contains(&r.confidence));
    }

    #[test]
    fn local_rag_wins_over_coverage_when_document_named() {
        let r = IntentClassifier::new().classify("Is acupuncture covered per the uploaded document?");
        assert_eq!(r.intent, Intent::LocalRag);
    }

    #[test]
    fn member_id_always_uppercased() {
        let r = IntentClassifier::new().classify("check status for m1002");
        assert_eq!(r.entities.member_id.as_deref(), Some("M1002"));
    }

    #[test]
    fn confidence_always_in_unit_range() {
        for prompt in ["", "   ", "asdkjaslkd", "M1001 deductible oop used covered"] {
            let r = IntentClassifier::new().classify(prompt);
            assert!((0.0..=1.0).contains(&r.confidence));
        }
    }
}
