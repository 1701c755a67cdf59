//! Shared chunking/enrichment logic for RAGIndexer (C5) and LocalDocHandler
//! (C7) — both consume the same page+block JSON shape and differ only in
//! where the bytes and models come from (spec §4.7).

use crate::entities::Chunk;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlockType {
    Line,
    Table,
    Form,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    #[serde(rename = "Id", alias = "id", default)]
    pub id: String,
    #[serde(rename = "BlockType", alias = "block_type")]
    pub block_type: BlockType,
    #[serde(rename = "Text", alias = "text", default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageDocument {
    #[serde(rename = "Blocks", alias = "blocks", default)]
    pub blocks: Vec<Block>,
}

pub struct ExtractedPage {
    pub text: String,
    pub has_tables: bool,
}

/// Concatenates LINE block text in document order, substituting a
/// `[TABLE: <block_id>]` placeholder for each TABLE block encountered
/// (spec §4.5 step 2).
pub fn extract_page_text(page: &PageDocument) -> ExtractedPage {
    let mut lines = Vec::new();
    let mut has_tables = false;
    for block in &page.blocks {
        match block.block_type {
            BlockType::Line => {
                if let Some(text) = &block.text {
                    lines.push(text.clone());
                }
            }
            BlockType::Table => {
                has_tables = true;
                lines.push(format!("[TABLE: {}]", block.id));
            }
            BlockType::Form => {
                if let Some(text) = &block.text {
                    lines.push(text.clone());
                }
            }
        }
    }
    ExtractedPage {
        text: lines.join("\n"),
        has_tables,
    }
}

static COLUMN_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {3,}").unwrap());
static CPT_LIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}\b").unwrap());
static SECTION_HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^(#.+|.+:)\s*$").unwrap());

fn is_table_ish(paragraph: &str) -> bool {
    paragraph.contains('|') || COLUMN_RUN_RE.is_match(paragraph) || CPT_LIKE_RE.is_match(paragraph)
}

fn word_count(paragraph: &str) -> usize {
    paragraph.split_whitespace().count()
}

/// Target chunk size in characters for the content type a paragraph opens
/// a new chunk with, scaled off the caller-supplied base `chunk_size`
/// (spec §4.5 step 3 / §6 `chunk_size=1000` default). Table-ish content
/// targets 0.6x the base, sparse content 1.5x, everything else 1x —
/// preserving the spec's 600/1000/1500 ratios at the default base.
fn target_size_for(paragraph: &str, chunk_size: usize) -> usize {
    if is_table_ish(paragraph) {
        (chunk_size * 3 / 5).max(1)
    } else if word_count(paragraph) < 20 {
        (chunk_size * 3 / 2).max(1)
    } else {
        chunk_size.max(1)
    }
}

const BENEFIT_CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("therapy", &["therapy", "rehab", "rehabilitation"]),
    ("diagnostic", &["x-ray", "mri", "diagnostic", "lab work", "laboratory"]),
    ("preventive", &["preventive", "screening", "wellness", "annual exam"]),
];

const COVERAGE_TYPE_KEYWORDS: &[(&str, &[&str])] = &[
    ("prior_auth_required", &["prior authorization", "prior auth"]),
    ("excluded", &["not covered", "excluded", "exclusion"]),
    ("covered", &["covered", "coverage includes"]),
];

fn detect_section_title(chunk_text: &str) -> Option<String> {
    SECTION_HEADING_RE
        .find(chunk_text)
        .map(|m| m.as_str().trim().trim_start_matches('#').trim().to_string())
}

fn detect_benefit_category(chunk_lower: &str) -> Option<String> {
    BENEFIT_CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| chunk_lower.contains(k)))
        .map(|(category, _)| category.to_string())
}

fn detect_coverage_type(chunk_lower: &str) -> Option<String> {
    COVERAGE_TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| chunk_lower.contains(k)))
        .map(|(coverage, _)| coverage.to_string())
}

fn detect_cpt_codes(chunk_text: &str) -> Vec<String> {
    CPT_LIKE_RE
        .find_iter(chunk_text)
        .map(|m| m.as_str().to_string())
        .take(10)
        .collect()
}

fn build_chunk(content_text: String, source: &str, page: u32, has_tables: bool) -> Chunk {
    let lower = content_text.to_lowercase();
    Chunk {
        section_title: detect_section_title(&content_text),
        benefit_category: detect_benefit_category(&lower),
        coverage_type: detect_coverage_type(&lower),
        cpt_codes: detect_cpt_codes(&content_text),
        has_cost_info: content_text.contains('$'),
        has_tables,
        source: source.to_string(),
        page,
        content_text,
    }
}

/// Splits `text` into paragraphs at blank-line boundaries and accumulates
/// them into chunks, closing a chunk once it reaches the target size of
/// the content type that opened it. Paragraph boundaries are never split
/// mid-paragraph (spec §4.5 step 3). `chunk_size` is the caller-supplied
/// base target (spec default 1000); `chunk_overlap` is accepted for
/// interface parity but intentionally unused — its behavior is left
/// undefined by the source algorithm.
pub fn chunk_document(text: &str, source: &str, page: u32, has_tables: bool, chunk_size: usize, _chunk_overlap: usize) -> Vec<Chunk> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut target = chunk_size.max(1);

    for paragraph in paragraphs {
        if current.is_empty() {
            target = target_size_for(paragraph, chunk_size);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
        if current.len() >= target {
            chunks.push(build_chunk(std::mem::take(&mut current), source, page, has_tables));
        }
    }
    if !current.is_empty() {
        chunks.push(build_chunk(current, source, page, has_tables));
    }
    chunks
}

/// `id = UUID(sha256(content_text)[:32])` (spec §4.5 step 6): the first 16
/// bytes (32 hex chars) of the content's SHA-256 digest, read as UUID
/// bytes directly so identical text always upserts to the same point.
pub fn deterministic_chunk_id(content_text: &str) -> String {
    let digest = Sha256::digest(content_text.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}
