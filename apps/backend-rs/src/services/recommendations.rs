use crate::models::Villa;

pub const DEFAULT_LIMIT: usize = 3;

const SAME_LOCATION: u32 = 15;
const SIMILAR_PRICE: u32 = 10;
const SIMILAR_CAPACITY: u32 = 5;
const SAME_BEDROOMS: u32 = 8;

/// Ranks "you may also like" villas for a detail page.
///
/// Every candidate other than the target is eligible, even with a zero score;
/// equal scores keep their candidate order.
pub fn recommend(target: &Villa, candidates: &[Villa], limit: usize) -> Vec<Villa> {
    let mut scored = candidates
        .iter()
        .filter(|candidate| candidate.id != target.id)
        .map(|candidate| (similarity_score(target, candidate), candidate))
        .collect::<Vec<_>>();

    scored.sort_by(|(left, _), (right, _)| right.cmp(left));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

pub(crate) fn similarity_score(target: &Villa, candidate: &Villa) -> u32 {
    let mut score = 0;

    if candidate.primary_location() == target.primary_location() {
        score += SAME_LOCATION;
    }

    // Within 25% of the target price, kept in integers.
    let price_gap = candidate.price.abs_diff(target.price);
    if price_gap.saturating_mul(4) <= target.price.unsigned_abs() {
        score += SIMILAR_PRICE;
    }

    if candidate.capacity.abs_diff(target.capacity) <= 2 {
        score += SIMILAR_CAPACITY;
    }

    if candidate.bedrooms == target.bedrooms {
        score += SAME_BEDROOMS;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::{recommend, similarity_score, DEFAULT_LIMIT};
    use crate::models::fixtures::villa;

    #[test]
    fn scores_each_signal() {
        let target = villa("t", "Lonavala, Maharashtra", 50_000, 3, 12);
        let close = villa("a", "Lonavala, X", 52_000, 3, 13);
        let far = villa("b", "Goa, Y", 100_000, 1, 6);
        assert_eq!(similarity_score(&target, &close), 38);
        assert_eq!(similarity_score(&target, &far), 0);

        let ranked = recommend(&target, &[far, close], DEFAULT_LIMIT);
        let ids = ranked.iter().map(|v| v.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn price_band_edge_is_inclusive() {
        let target = villa("t", "Goa", 40_000, 9, 40);
        let edge = villa("a", "Alibaug", 50_000, 1, 1);
        let past_edge = villa("b", "Alibaug", 50_001, 1, 1);
        assert_eq!(similarity_score(&target, &edge), 10);
        assert_eq!(similarity_score(&target, &past_edge), 0);
    }

    #[test]
    fn location_token_is_case_sensitive() {
        let target = villa("t", "Goa, India", 1, 9, 40);
        let other = villa("a", "goa, India", 1_000, 1, 1);
        assert_eq!(similarity_score(&target, &other), 0);
    }

    #[test]
    fn empty_or_self_only_pool_yields_nothing() {
        let target = villa("t", "Goa", 10_000, 2, 4);
        assert!(recommend(&target, &[], 3).is_empty());
        assert!(recommend(&target, &[target.clone()], 3).is_empty());
    }

    #[test]
    fn ties_keep_candidate_order_and_limit_applies() {
        let target = villa("t", "Goa, India", 10_000, 2, 4);
        let pool = vec![
            villa("x", "Pune", 90_000, 5, 20),
            target.clone(),
            villa("a", "Goa, North", 10_500, 2, 4),
            villa("b", "Goa, South", 9_500, 2, 5),
            villa("c", "Goa", 11_000, 2, 3),
        ];
        let ranked = recommend(&target, &pool, 2);
        let ids = ranked.iter().map(|v| v.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);

        let all = recommend(&target, &pool, 10);
        assert_eq!(all.len(), 4);
        assert_eq!(all.last().map(|v| v.id.as_str()), Some("x"));
    }
}
