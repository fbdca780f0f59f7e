//! Evidence & Memory Packer (spec.md §4.8): after synthesis, scan the
//! report for claim-like sentences, map each to the agents whose content
//! shares vocabulary with it, and build a traceability pack plus a memory
//! snapshot. Best-effort and pure — any shortfall just yields fewer
//! claims/sources, never an error, matching "the packer's failure is
//! logged but does not fail the session."
//!
//! Grounded structurally on `crates/contextpack/src/builder.rs`'s
//! `ContextPackBuilder::build` (a pure function over pre-gathered inputs
//! producing an assembled artifact) and `crates/contextpack/src/truncation.rs`'s
//! style of small, heavily unit-tested string-processing helpers.

use std::collections::HashMap;

use mi_domain::model::{AgentResult, Claim, EvidencePack, EvidenceSource, MemorySnapshot, Traceability};

const MIN_CLAIM_WORDS: usize = 6;
const URL_PREFIXES: [&str; 2] = ["http://", "https://"];

/// Build an `EvidencePack` and `MemorySnapshot` from the synthesized
/// report and the agent results that fed it.
pub fn build_evidence_and_memory(report: &str, results: &[AgentResult]) -> (EvidencePack, MemorySnapshot) {
    let claims = extract_claims(report, results);
    let sources = extract_sources(results);
    let traceability = claims
        .iter()
        .map(|c| Traceability {
            claim_id: c.id.clone(),
            agent_result_ids: c.source_agents.clone(),
            tool_invocation_ids: Vec::new(),
        })
        .collect();

    let pack = EvidencePack { claims, sources, traceability };

    let mut agent_highlights = HashMap::new();
    for result in results {
        let highlights: Vec<String> = result
            .content
            .split('.')
            .map(str::trim)
            .filter(|s| s.split_whitespace().count() >= MIN_CLAIM_WORDS)
            .take(3)
            .map(str::to_string)
            .collect();
        if !highlights.is_empty() {
            agent_highlights.insert(result.agent_name.clone(), highlights);
        }
    }
    let entities = results.iter().map(|r| r.agent_name.clone()).collect();
    let snapshot = MemorySnapshot { entities, agent_highlights };

    (pack, snapshot)
}

/// Split the report into claim-like sentences (long enough to carry
/// substance) and attribute each to whichever agents share enough
/// vocabulary with it to plausibly be its source.
fn extract_claims(report: &str, results: &[AgentResult]) -> Vec<Claim> {
    report
        .split('.')
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() >= MIN_CLAIM_WORDS)
        .enumerate()
        .map(|(idx, sentence)| {
            let source_agents = attribute_sentence(sentence, results);
            Claim {
                id: format!("claim-{idx}"),
                text: sentence.to_string(),
                source_agents,
                supporting_sources: Vec::new(),
            }
        })
        .collect()
}

/// Lexical-overlap attribution: an agent is credited as a source for a
/// claim if a meaningful fraction of the claim's words also appear in
/// that agent's own content.
fn attribute_sentence(sentence: &str, results: &[AgentResult]) -> Vec<String> {
    let sentence_words: Vec<String> = sentence
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 3)
        .collect();
    if sentence_words.is_empty() {
        return Vec::new();
    }

    results
        .iter()
        .filter(|r| {
            let content_lower = r.content.to_lowercase();
            let overlap = sentence_words.iter().filter(|w| content_lower.contains(w.as_str())).count();
            overlap as f64 / sentence_words.len() as f64 >= 0.3
        })
        .map(|r| r.agent_name.clone())
        .collect()
}

/// URL-like tokens scattered through agent content become `EvidenceSource`
/// entries; anything else is not currently extracted (no author-citation
/// grammar is defined by the spec's supplemental entity).
fn extract_sources(results: &[AgentResult]) -> Vec<EvidenceSource> {
    let mut sources = Vec::new();
    for result in results {
        for (idx, token) in result.content.split_whitespace().enumerate() {
            if URL_PREFIXES.iter().any(|p| token.starts_with(p)) {
                sources.push(EvidenceSource {
                    id: format!("{}-src-{idx}", result.agent_name),
                    kind: "url".to_string(),
                    reference: token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '/' && c != ':' && c != '.').to_string(),
                });
            }
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mi_domain::model::AgentStatus;
    use uuid::Uuid;

    fn agent(name: &str, content: &str) -> AgentResult {
        AgentResult {
            session_id: Uuid::new_v4(),
            agent_name: name.to_string(),
            content: content.to_string(),
            thinking: String::new(),
            sources: Vec::new(),
            confidence: None,
            status: AgentStatus::Completed,
            duration_ms: Some(10),
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn extracts_long_sentences_as_claims() {
        let report = "Short. The German consumer electronics market is growing steadily this year. Ok.";
        let results = vec![agent(
            "trend_scout",
            "The German consumer electronics market is growing steadily this year.",
        )];
        let (pack, _snapshot) = build_evidence_and_memory(report, &results);
        assert_eq!(pack.claims.len(), 1);
        assert!(pack.claims[0].source_agents.contains(&"trend_scout".to_string()));
    }

    #[test]
    fn attributes_claim_to_multiple_agents_on_overlap() {
        let report = "Tariffs on imported electronics are rising across the European Union.";
        let results = vec![
            agent("trend_scout", "Tariffs on imported electronics are rising across the region."),
            agent("regulation_checker", "New tariffs targeting electronics imports took effect."),
            agent("social_sentinel", "Consumers are unaware of streaming service changes."),
        ];
        let (pack, _snapshot) = build_evidence_and_memory(report, &results);
        assert_eq!(pack.claims.len(), 1);
        assert!(pack.claims[0].source_agents.contains(&"trend_scout".to_string()));
        assert!(pack.claims[0].source_agents.contains(&"regulation_checker".to_string()));
        assert!(!pack.claims[0].source_agents.contains(&"social_sentinel".to_string()));
    }

    #[test]
    fn extracts_url_like_tokens_as_sources() {
        let results = vec![agent(
            "competitor_analyst",
            "See https://example.com/report for the full competitor breakdown.",
        )];
        let (pack, _snapshot) = build_evidence_and_memory("irrelevant report text here", &results);
        assert_eq!(pack.sources.len(), 1);
        assert_eq!(pack.sources[0].kind, "url");
    }

    #[test]
    fn memory_snapshot_collects_entities_and_highlights() {
        let results = vec![agent(
            "trend_scout",
            "The consumer electronics sector shows steady double digit growth this year.",
        )];
        let (_pack, snapshot) = build_evidence_and_memory("report", &results);
        assert_eq!(snapshot.entities, vec!["trend_scout".to_string()]);
        assert!(snapshot.agent_highlights.contains_key("trend_scout"));
    }

    #[test]
    fn empty_report_yields_no_claims_without_panicking() {
        let (pack, snapshot) = build_evidence_and_memory("", &[]);
        assert!(pack.claims.is_empty());
        assert!(snapshot.entities.is_empty());
    }
}
