use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use scribe_core::context::TurnContext;
use scribe_core::document::{Document, ResolvedCitation};
use scribe_core::emitter::Emitter;
use scribe_core::packet::PacketPayload;

/// Matches citation markers like `[[1]]` or `[[ 2, 3 ]]`.
fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\[\s*\d+(?:\s*,\s*\d+)*\s*\]\]").expect("valid citation marker regex")
    })
}

/// Ranks referenced by the answer text, deduplicated, in order of first
/// appearance. Malformed markers are ignored by construction.
pub fn extract_ranks(text: &str) -> Vec<u32> {
    let mut seen = std::collections::HashSet::new();
    let mut ranks = Vec::new();
    for marker in marker_regex().find_iter(text) {
        let inner = marker
            .as_str()
            .trim_start_matches("[[")
            .trim_end_matches("]]");
        for part in inner.split(',') {
            if let Ok(rank) = part.trim().parse::<u32>() {
                if seen.insert(rank) {
                    ranks.push(rank);
                }
            }
        }
    }
    ranks
}

/// Resolve ranks against the 1-based ordered cited-document list.
/// Out-of-range ranks are dropped.
pub fn resolve(text: &str, cited_documents: &[Document]) -> Vec<ResolvedCitation> {
    extract_ranks(text)
        .into_iter()
        .filter_map(|rank| {
            let idx = rank.checked_sub(1)? as usize;
            let document = cited_documents.get(idx)?.clone();
            Some(ResolvedCitation { rank, document })
        })
        .collect()
}

/// Resolve citations in the final answer and emit the citation section.
/// Nothing is emitted when no marker resolves. Returns the resolved
/// ranks for persistence.
pub fn resolve_and_emit(
    final_answer: &str,
    cited_documents: &[Document],
    turn: &mut TurnContext,
    emitter: &Emitter,
) -> Vec<u32> {
    let resolved = resolve(final_answer, cited_documents);
    if resolved.is_empty() {
        return Vec::new();
    }

    debug!(count = resolved.len(), "resolved citations");
    let ranks: Vec<u32> = resolved.iter().map(|c| c.rank).collect();

    let step = turn.current_step;
    emitter.emit(step, PacketPayload::CitationStart);
    emitter.emit(step, PacketPayload::CitationDelta { citations: resolved });
    emitter.emit(step, PacketPayload::SectionEnd);
    turn.advance_step(2);

    ranks
}
