//! Deterministic answer confidence.
//!
//! `0` without evidence or answer text. Otherwise
//! `BASE + TOP_SCORE_WEIGHT * top_score + EVIDENCE_WEIGHT * min(n, EVIDENCE_CAP)`,
//! minus `UNCERTAINTY_PENALTY` when the answer hedges, clamped to `[0, 1]`.

use super::store::EvidenceItem;

pub const BASE: f32 = 0.20;
pub const TOP_SCORE_WEIGHT: f32 = 0.50;
pub const EVIDENCE_WEIGHT: f32 = 0.05;
pub const EVIDENCE_CAP: usize = 3;
pub const UNCERTAINTY_PENALTY: f32 = 0.40;

const UNCERTAINTY_PHRASES: &[&str] = &[
    "i don't know",
    "i do not know",
    "not sure",
    "couldn't find",
    "could not find",
    "no information",
    "not found",
    "not mentioned",
    "not available in",
    "does not contain",
    "doesn't contain",
    "unable to find",
    "unclear",
];

pub fn has_uncertainty(answer: &str) -> bool {
    let lower = answer.to_lowercase().replace('’', "'");
    UNCERTAINTY_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

pub fn score(answer: &str, evidence: &[EvidenceItem]) -> f32 {
    if evidence.is_empty() || answer.trim().is_empty() {
        return 0.0;
    }

    let top_score = evidence
        .iter()
        .map(|item| item.similarity_score)
        .fold(0.0f32, f32::max);
    let support = evidence.len().min(EVIDENCE_CAP) as f32;

    let mut confidence = BASE + TOP_SCORE_WEIGHT * top_score + EVIDENCE_WEIGHT * support;
    if has_uncertainty(answer) {
        confidence -= UNCERTAINTY_PENALTY;
    }
    confidence.clamp(0.0, 1.0)
}
