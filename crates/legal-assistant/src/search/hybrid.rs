use std::collections::HashSet;

/// A candidate position from the hybrid union and which index surfaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HybridCandidate {
    pub position: usize,
    pub source: HybridSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HybridSource {
    Vector,
    TextSearch,
    Both,
}

/// Union of dense and lexical hits without score fusion: dense hits in rank
/// order, then lexical hits not already present. Final ordering is left to the
/// reranker.
pub fn union_candidates(dense: &[(usize, f32)], lexical: &[(usize, f32)]) -> Vec<HybridCandidate> {
    let mut seen = HashSet::new();
    let mut candidates: Vec<HybridCandidate> = dense
        .iter()
        .filter(|(position, _)| seen.insert(*position))
        .map(|(position, _)| HybridCandidate {
            position: *position,
            source: HybridSource::Vector,
        })
        .collect();

    for (position, _) in lexical {
        if seen.insert(*position) {
            candidates.push(HybridCandidate {
                position: *position,
                source: HybridSource::TextSearch,
            });
        } else if let Some(existing) = candidates.iter_mut().find(|c| c.position == *position) {
            existing.source = HybridSource::Both;
        }
    }

    candidates
}
