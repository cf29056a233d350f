use std::collections::HashMap;

use newsrag_core::types::{ChunkId, SearchHit};

/// Candidate after reciprocal-rank fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
    pub id: ChunkId,
    pub score: f32,
    /// 1-based position in the lexical list, if present.
    pub lexical_rank: Option<usize>,
    /// 1-based position in the vector list, if present.
    pub vector_rank: Option<usize>,
}

/// Weighted reciprocal-rank fusion.
///
/// `score = Σ weight / (rank + k)` over the lists a chunk appears in, with
/// 1-based ranks. Raw BM25 and cosine scores are never compared. Output is
/// ordered by fused score descending, ties by chunk id ascending.
pub fn rrf_fuse(
    lexical: &[SearchHit],
    vector: &[SearchHit],
    lexical_weight: f32,
    vector_weight: f32,
    k: f32,
) -> Vec<FusedCandidate> {
    let mut by_id: HashMap<&ChunkId, FusedCandidate> = HashMap::new();
    for (i, hit) in lexical.iter().enumerate() {
        let rank = i + 1;
        let entry = by_id.entry(&hit.id).or_insert_with(|| FusedCandidate {
            id: hit.id.clone(),
            score: 0.0,
            lexical_rank: None,
            vector_rank: None,
        });
        entry.score += lexical_weight / (rank as f32 + k);
        entry.lexical_rank = Some(rank);
    }
    for (i, hit) in vector.iter().enumerate() {
        let rank = i + 1;
        let entry = by_id.entry(&hit.id).or_insert_with(|| FusedCandidate {
            id: hit.id.clone(),
            score: 0.0,
            lexical_rank: None,
            vector_rank: None,
        });
        entry.score += vector_weight / (rank as f32 + k);
        entry.vector_rank = Some(rank);
    }
    let mut fused: Vec<FusedCandidate> = by_id.into_values().collect();
    fused.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsrag_core::types::SourceKind;

    fn hits(ids: &[&str], source: SourceKind) -> Vec<SearchHit> {
        ids.iter()
            .enumerate()
            .map(|(i, d)| SearchHit { id: ChunkId::new(*d, 0), score: 10.0 - i as f32, source })
            .collect()
    }

    fn order(fused: &[FusedCandidate]) -> Vec<&str> {
        fused.iter().map(|c| c.id.document_id()).collect()
    }

    #[test]
    fn first_in_both_lists_is_first_overall() {
        let lex = hits(&["a", "b", "c"], SourceKind::Lexical);
        let vec = hits(&["a", "c", "d"], SourceKind::Vector);
        let fused = rrf_fuse(&lex, &vec, 1.0, 1.0, 60.0);
        assert_eq!(order(&fused), ["a", "c", "b", "d"]);
        assert_eq!((fused[0].lexical_rank, fused[0].vector_rank), (Some(1), Some(1)));
        assert!((fused[0].score - 2.0 / 61.0).abs() < 1e-7);
    }

    #[test]
    fn absent_source_contributes_nothing_and_ties_break_by_id() {
        let lex = hits(&["z"], SourceKind::Lexical);
        let vec = hits(&["y"], SourceKind::Vector);
        let fused = rrf_fuse(&lex, &vec, 1.0, 1.0, 60.0);
        assert_eq!(order(&fused), ["y", "z"]);
        assert_eq!(fused[0].lexical_rank, None);
        assert_eq!(fused[1].vector_rank, None);
        assert_eq!(fused[0].score, fused[1].score);
    }

    #[test]
    fn weights_shift_the_balance() {
        let lex = hits(&["a", "b"], SourceKind::Lexical);
        let vec = hits(&["b", "a"], SourceKind::Vector);
        assert_eq!(order(&rrf_fuse(&lex, &vec, 2.0, 1.0, 60.0)), ["a", "b"]);
        assert_eq!(order(&rrf_fuse(&lex, &vec, 1.0, 2.0, 60.0)), ["b", "a"]);
        // Equal weights and mirrored ranks tie; id decides.
        assert_eq!(order(&rrf_fuse(&lex, &vec, 1.0, 1.0, 60.0)), ["a", "b"]);
    }

    #[test]
    fn empty_inputs_fuse_to_nothing() {
        assert!(rrf_fuse(&[], &[], 1.0, 1.0, 60.0).is_empty());
    }
}
