use std::collections::HashSet;

use crate::core::domain::Structure;

/// Set fingerprint over the canonical encoding: overlapping byte bigrams
/// with `^`/`$` terminators so single-atom encodings still produce a
/// non-empty set. Cheap stand-in for a substructure fingerprint; the
/// engine only needs a stable relative ordering toward a reference.
pub fn fingerprint(encoding: &str) -> HashSet<[u8; 2]> {
    let padded = format!("^{encoding}$");
    padded
        .as_bytes()
        .windows(2)
        .map(|w| [w[0], w[1]])
        .collect()
}

/// Tanimoto coefficient of the two fingerprint sets, in [0, 1].
pub fn tanimoto(a: &HashSet<[u8; 2]>, b: &HashSet<[u8; 2]>) -> f64 {
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        return 0.0;
    }
    inter as f64 / union as f64
}

/// Similarity of a candidate structure to the reference structure.
pub fn similarity(candidate: &Structure, reference: &Structure) -> f64 {
    tanimoto(
        &fingerprint(&candidate.encoding),
        &fingerprint(&reference.encoding),
    )
}

/// Index of the candidate most similar to `reference`. Ties resolve to the
/// first occurrence. Returns `None` on an empty slice.
pub fn most_similar(candidates: &[(String, Structure)], reference: &Structure) -> Option<usize> {
    let ref_fp = fingerprint(&reference.encoding);

    let mut best: Option<(usize, f64)> = None;
    for (i, (_, structure)) in candidates.iter().enumerate() {
        let score = tanimoto(&fingerprint(&structure.encoding), &ref_fp);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Sorts candidates by descending similarity to `reference`. The sort is
/// stable, so equally similar candidates keep their enumeration order.
pub fn rank_by_similarity(
    candidates: Vec<(String, Structure)>,
    reference: &Structure,
) -> Vec<(String, Structure)> {
    let ref_fp = fingerprint(&reference.encoding);

    let mut scored: Vec<(f64, (String, Structure))> = candidates
        .into_iter()
        .map(|c| (tanimoto(&fingerprint(&c.1.encoding), &ref_fp), c))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    scored.into_iter().map(|(_, c)| c).collect()
}
